pub mod k8s;
pub mod rio;

use crate::model::Footer;
use crate::view::ViewSpec;
use clap::ValueEnum;
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BladeKind {
    Rio,
    K8s,
}

#[derive(Clone)]
pub struct BladeContext {
    pub rio: String,
    pub kubectl: String,
    pub client: Option<kube::Client>,
}

#[derive(Clone)]
pub struct Blade {
    name: &'static str,
    root: String,
    footers: Vec<Footer>,
    shortcuts: Vec<(&'static str, &'static str)>,
    views: HashMap<String, ViewSpec>,
}

impl Blade {
    pub fn new(name: &'static str, root: &str) -> Self {
        Self {
            name,
            root: root.to_string(),
            footers: Vec::new(),
            shortcuts: Vec::new(),
            views: HashMap::new(),
        }
    }

    pub fn with_root_view(mut self, index: char, spec: ViewSpec) -> Self {
        self.footers.push(Footer {
            index,
            title: spec.kind.title().to_string(),
            kind: spec.kind.kind().to_string(),
        });
        self.views.insert(spec.kind.kind().to_string(), spec);
        self
    }

    pub fn with_shortcut(mut self, key: &'static str, description: &'static str) -> Self {
        self.shortcuts.push((key, description));
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn footers(&self) -> &[Footer] {
        &self.footers
    }

    pub fn shortcuts(&self) -> &[(&'static str, &'static str)] {
        &self.shortcuts
    }

    pub fn view_spec(&self, kind: &str) -> Option<ViewSpec> {
        self.views.get(kind).cloned()
    }

    pub fn page_for_key(&self, key: char) -> Option<&str> {
        self.footers
            .iter()
            .find(|footer| footer.index == key)
            .map(|footer| footer.kind.as_str())
    }
}

pub fn build(kind: BladeKind, context: BladeContext) -> Blade {
    match kind {
        BladeKind::Rio => rio::blade(context),
        BladeKind::K8s => k8s::blade(context),
    }
}
