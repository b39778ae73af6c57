use super::{Blade, BladeContext};
use crate::datasource::{RefreshError, refresher};
use crate::k8s::{api_resources, resource_arg};
use crate::model::{ActionDef, Command, Invocation, ResourceKind};
use crate::nav::{Confirm, Dialog};
use crate::process::capture_table;
use crate::view::{EventHandler, ViewHandle, ViewSpec};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::sync::Arc;

const ROOT: &str = "kubernetes";
const PODS: &str = "pods";

const ITEM_ACTIONS: [ActionDef; 5] = [
    ActionDef::new("get", 'g', "show the resource as yaml"),
    ActionDef::new("edit", 'e', "edit the resource"),
    ActionDef::new("delete", 'd', "delete the resource"),
    ActionDef::new("logs", 'l', "follow logs"),
    ActionDef::new("exec", 'x', "open a shell in a pod"),
];

pub fn blade(context: BladeContext) -> Blade {
    let client = context.client.clone();
    let root = ViewSpec {
        kind: ResourceKind::new("Kubernetes", ROOT),
        refresher: refresher(move || {
            let client = client.clone();
            async move {
                match client {
                    Some(client) => api_resources(client).await,
                    None => Err(RefreshError::Api(
                        "no Kubernetes client; check --kubeconfig".to_string(),
                    )),
                }
            }
        }),
        actions: Vec::new(),
        handler: Arc::new(ApiResourcesHandler {
            kubectl: context.kubectl,
        }),
    };

    Blade::new("k8s", ROOT)
        .with_root_view('1', root)
        .with_shortcut("enter", "open")
        .with_shortcut("g", "get")
        .with_shortcut("e", "edit")
        .with_shortcut("d", "delete")
        .with_shortcut("l", "logs")
        .with_shortcut("x", "exec")
        .with_shortcut("r", "refresh")
        .with_shortcut("/", "search")
        .with_shortcut("q", "root")
}

struct ApiResourcesHandler {
    kubectl: String,
}

impl ApiResourcesHandler {
    fn resource_view(&self, plural: &str, group_version: &str) -> ViewSpec {
        let resource = resource_arg(plural, group_version);
        let invocation = Invocation::new(&self.kubectl).args([
            "get",
            resource.as_str(),
            "--all-namespaces",
        ]);
        ViewSpec {
            kind: ResourceKind::new(plural, resource),
            refresher: refresher(move || {
                let invocation = invocation.clone();
                async move { capture_table(&invocation).await }
            }),
            actions: ITEM_ACTIONS.to_vec(),
            handler: Arc::new(ResourceHandler {
                kubectl: self.kubectl.clone(),
            }),
        }
    }
}

impl EventHandler for ApiResourcesHandler {
    fn on_key(&self, key: KeyEvent, view: &mut dyn ViewHandle) -> bool {
        if key.code != KeyCode::Enter {
            return false;
        }
        let (Some(plural), Some(group_version)) = (view.selected_cell(0), view.selected_cell(1))
        else {
            return true;
        };
        if plural.is_empty() {
            return true;
        }
        view.push_nested(self.resource_view(&plural, &group_version));
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Target {
    namespace: Option<String>,
    name: String,
}

impl Target {
    /// `kubectl get --all-namespaces` puts NAMESPACE first for namespaced kinds.
    fn resolve(view: &dyn ViewHandle) -> Option<Self> {
        let namespaced = view
            .header()
            .first()
            .is_some_and(|column| column.contains("NAMESPACE"));
        let (namespace, name) = if namespaced {
            (view.selected_cell(0), view.selected_cell(1)?)
        } else {
            (None, view.selected_cell(0)?)
        };
        if name.is_empty() {
            return None;
        }
        Some(Self {
            namespace: namespace.filter(|namespace| !namespace.is_empty()),
            name,
        })
    }

    fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }
}

struct ResourceHandler {
    kubectl: String,
}

impl ResourceHandler {
    fn kubectl(&self, verb: &str) -> Invocation {
        Invocation::new(&self.kubectl).arg(verb)
    }
}

impl EventHandler for ResourceHandler {
    fn on_key(&self, key: KeyEvent, view: &mut dyn ViewHandle) -> bool {
        if key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) {
            return false;
        }
        let KeyCode::Char(c) = key.code else {
            return false;
        };
        let Some(action) = ITEM_ACTIONS.iter().find(|action| action.shortcut == c) else {
            return false;
        };
        self.on_action(action.name, None, view);
        true
    }

    fn on_action(&self, action: &str, _argument: Option<&str>, view: &mut dyn ViewHandle) {
        let Some(target) = Target::resolve(view) else {
            view.update_status("nothing selected", true);
            return;
        };
        let kind = view.resource_kind();
        let namespace = target.namespace();
        let name = target.name.as_str();
        match action {
            "get" => view.dispatch(Command::Capture {
                invocation: self
                    .kubectl("get")
                    .arg(kind.as_str())
                    .opt_arg("-n", namespace)
                    .args([name, "-o", "yaml"]),
                title: format!("{kind} {name}"),
                style: None,
            }),
            "edit" => view.dispatch(Command::Interactive {
                invocation: self
                    .kubectl("edit")
                    .arg(kind.as_str())
                    .opt_arg("-n", namespace)
                    .arg(name),
                label: format!("edit {kind} {name}"),
            }),
            "delete" => {
                let command = Command::Mutate {
                    invocation: self
                        .kubectl("delete")
                        .arg(kind.as_str())
                        .opt_arg("-n", namespace)
                        .arg(name),
                    label: format!("delete {kind} {name}"),
                };
                view.insert_dialog(
                    "delete",
                    Dialog::Confirm(Confirm::new(
                        format!("Do you want to delete {kind} {name}?"),
                        "Delete",
                        command,
                    )),
                );
            }
            "logs" => {
                let object = if kind == PODS {
                    name.to_string()
                } else {
                    format!("{kind}/{name}")
                };
                view.dispatch(Command::Follow {
                    invocation: self
                        .kubectl("logs")
                        .arg("-f")
                        .opt_arg("-n", namespace)
                        .arg(object),
                    title: format!("logs - ({name})"),
                });
            }
            "exec" if kind == PODS => view.dispatch(Command::Interactive {
                invocation: self
                    .kubectl("exec")
                    .arg("-it")
                    .opt_arg("-n", namespace)
                    .args([name, "--", "sh"]),
                label: format!("exec {name}"),
            }),
            "exec" => view.update_status("exec is only available for pods", true),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blade::tests::RecordingHandle;

    fn handler() -> ResourceHandler {
        ResourceHandler {
            kubectl: "kubectl".to_string(),
        }
    }

    fn pod_handle() -> RecordingHandle {
        RecordingHandle::new(
            PODS,
            &["NAMESPACE", "NAME", "READY", "STATUS"],
            &["kube-system", "coredns-5d78c9869d-abcde", "1/1", "Running"],
        )
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn enter_drills_into_the_selected_resource() {
        let root = ApiResourcesHandler {
            kubectl: "kubectl".to_string(),
        };
        let mut handle = RecordingHandle::new(
            ROOT,
            &["NAME", "GROUPVERSION", "NAMESPACED"],
            &["deployments", "apps/v1", "true"],
        );
        assert!(root.on_key(press(KeyCode::Enter), &mut handle));
        assert_eq!(handle.nested, vec!["deployments.apps"]);
        assert!(!root.on_key(press(KeyCode::Char('g')), &mut handle));
    }

    #[test]
    fn resource_view_lists_across_namespaces() {
        let root = ApiResourcesHandler {
            kubectl: "kubectl".to_string(),
        };
        let spec = root.resource_view("pods", "v1");
        assert_eq!(spec.kind.kind(), "pods");
        assert_eq!(spec.kind.title(), "pods");
        assert_eq!(spec.actions, ITEM_ACTIONS.to_vec());
    }

    #[test]
    fn namespace_comes_from_the_first_column_when_present() {
        let handle = pod_handle();
        assert_eq!(
            Target::resolve(&handle),
            Some(Target {
                namespace: Some("kube-system".to_string()),
                name: "coredns-5d78c9869d-abcde".to_string(),
            })
        );

        let cluster = RecordingHandle::new("nodes", &["NAME", "STATUS"], &["node-1", "Ready"]);
        assert_eq!(
            Target::resolve(&cluster),
            Some(Target {
                namespace: None,
                name: "node-1".to_string(),
            })
        );
    }

    #[test]
    fn get_key_captures_yaml() {
        let mut handle = pod_handle();
        assert!(handler().on_key(press(KeyCode::Char('g')), &mut handle));
        assert_eq!(
            handle.commands,
            vec![Command::Capture {
                invocation: Invocation::new("kubectl").args([
                    "get",
                    "pods",
                    "-n",
                    "kube-system",
                    "coredns-5d78c9869d-abcde",
                    "-o",
                    "yaml"
                ]),
                title: "pods coredns-5d78c9869d-abcde".to_string(),
                style: None,
            }]
        );
    }

    #[test]
    fn delete_uses_kubectl_after_confirmation() {
        let mut handle = RecordingHandle::new("nodes", &["NAME", "STATUS"], &["node-1", "Ready"]);
        handler().on_action("delete", None, &mut handle);
        assert!(handle.commands.is_empty());
        let Some((_, Dialog::Confirm(confirm))) = handle.dialogs.first() else {
            panic!("expected confirm dialog");
        };
        assert!(!confirm.confirm_selected);
        assert_eq!(
            confirm.on_confirm,
            Command::Mutate {
                invocation: Invocation::new("kubectl").args(["delete", "nodes", "node-1"]),
                label: "delete nodes node-1".to_string(),
            }
        );
    }

    #[test]
    fn logs_address_non_pods_by_kind() {
        let mut handle = RecordingHandle::new(
            "deployments.apps",
            &["NAMESPACE", "NAME", "READY"],
            &["default", "web", "1/1"],
        );
        handler().on_action("logs", None, &mut handle);
        let Some(Command::Follow { invocation, .. }) = handle.commands.first() else {
            panic!("expected follow command");
        };
        assert_eq!(
            invocation.args,
            vec!["logs", "-f", "-n", "default", "deployments.apps/web"]
        );
    }

    #[test]
    fn exec_is_refused_outside_pods() {
        let mut handle = RecordingHandle::new("nodes", &["NAME"], &["node-1"]);
        handler().on_action("exec", None, &mut handle);
        assert!(handle.commands.is_empty());
        assert!(handle.statuses[0].1);

        let mut pods = pod_handle();
        handler().on_action("exec", None, &mut pods);
        let Some(Command::Interactive { invocation, .. }) = pods.commands.first() else {
            panic!("expected interactive command");
        };
        assert_eq!(invocation.args.last().map(String::as_str), Some("sh"));
    }

    #[test]
    fn empty_row_reports_nothing_selected() {
        let mut handle = RecordingHandle::new(PODS, &["NAMESPACE", "NAME"], &[]);
        handler().on_action("get", None, &mut handle);
        assert!(handle.commands.is_empty());
        assert_eq!(handle.statuses, vec![("nothing selected".to_string(), true)]);
    }
}
