use super::{Blade, BladeContext};
use crate::datasource::refresher;
use crate::highlight;
use crate::model::{ActionDef, Command, ContainerPurpose, Invocation, ResourceKind};
use crate::nav::{ChoiceEffect, ChoiceItem, ChoiceList, Confirm, Dialog};
use crate::process::capture_table;
use crate::view::{EventHandler, ViewHandle, ViewSpec};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::sync::Arc;

const SERVICES: &str = "services";
const ROUTES: &str = "routes";
const PODS: &str = "pods";

const STACK_LABEL: &str = "rio.cattle.io/stack";
const SERVICE_LABEL: &str = "rio.cattle.io/service";

const SHELL_BOOTSTRAP: &str = "TERM=xterm-256color; export TERM; [ -x /bin/bash ] && ([ -x /usr/bin/script ] && /usr/bin/script -q -c /bin/bash /dev/null || exec /bin/bash) || exec /bin/sh";

const INSPECT: ActionDef = ActionDef::new("inspect", 'i', "inspect a resource");
const EDIT: ActionDef = ActionDef::new("edit", 'e', "edit a resource");
const DELETE: ActionDef = ActionDef::new("delete", 'd', "delete a resource");
const EXEC: ActionDef = ActionDef::new("exec", 'x', "exec into a container or service");
const LOGS: ActionDef = ActionDef::new("logs", 'l', "view logs of a service");
const VIEW_PODS: ActionDef = ActionDef::new("pods", 'p', "view pods of a service");

pub fn blade(context: BladeContext) -> Blade {
    let handler: Arc<dyn EventHandler> = Arc::new(RioHandler {
        rio: context.rio.clone(),
    });
    Blade::new("rio", SERVICES)
        .with_root_view(
            '1',
            list_view(
                &context.rio,
                ResourceKind::new("Services", SERVICES),
                &["ps"],
                vec![INSPECT, EDIT, DELETE, EXEC, LOGS, VIEW_PODS],
                handler.clone(),
            ),
        )
        .with_root_view(
            '2',
            list_view(
                &context.rio,
                ResourceKind::new("Routes", ROUTES),
                &["route"],
                vec![INSPECT, EDIT, DELETE],
                handler,
            ),
        )
        .with_shortcut("i", "inspect")
        .with_shortcut("e", "edit")
        .with_shortcut("l", "logs")
        .with_shortcut("x", "exec")
        .with_shortcut("d", "delete")
        .with_shortcut("p", "pods")
        .with_shortcut("r", "refresh")
        .with_shortcut("/", "search")
        .with_shortcut("m", "menu")
}

fn list_view(
    program: &str,
    kind: ResourceKind,
    args: &[&str],
    actions: Vec<ActionDef>,
    handler: Arc<dyn EventHandler>,
) -> ViewSpec {
    let invocation = Invocation::new(program).args(args.iter().copied());
    ViewSpec {
        kind,
        refresher: refresher(move || {
            let invocation = invocation.clone();
            async move { capture_table(&invocation).await }
        }),
        actions,
        handler,
    }
}

pub fn service_selector(name: &str) -> String {
    let (stack, service) = match name.split_once('/') {
        Some((stack, service)) => (stack, service),
        None => ("default", name),
    };
    format!("{STACK_LABEL}={stack},{SERVICE_LABEL}={service}")
}

fn rio_type(kind: &str) -> &str {
    match kind {
        SERVICES => "service",
        ROUTES => "route",
        other => other,
    }
}

// Inspect arguments: `yaml`, `yaml+` to pick a colour style, `yaml:<style>`.
#[derive(Debug, PartialEq, Eq)]
enum InspectRequest<'a> {
    PickFormat,
    PickStyle(&'a str),
    Render {
        format: &'a str,
        style: Option<&'a str>,
    },
}

impl<'a> InspectRequest<'a> {
    fn parse(argument: Option<&'a str>) -> Self {
        let Some(argument) = argument else {
            return Self::PickFormat;
        };
        if let Some(format) = argument.strip_suffix('+') {
            return Self::PickStyle(format);
        }
        match argument.split_once(':') {
            Some((format, style)) => Self::Render {
                format,
                style: Some(style),
            },
            None => Self::Render {
                format: argument,
                style: None,
            },
        }
    }
}

fn inspect_choice(label: &str, description: &str, shortcut: char, argument: &str) -> ChoiceItem {
    ChoiceItem {
        label: label.to_string(),
        description: description.to_string(),
        shortcut: Some(shortcut),
        effect: ChoiceEffect::Action {
            name: INSPECT.name.to_string(),
            argument: Some(argument.to_string()),
        },
    }
}

struct RioHandler {
    rio: String,
}

impl RioHandler {
    fn rio(&self) -> Invocation {
        Invocation::new(&self.rio)
    }

    fn inspect(&self, argument: Option<&str>, name: &str, view: &mut dyn ViewHandle) {
        match InspectRequest::parse(argument) {
            InspectRequest::PickFormat => {
                let formats = vec![
                    inspect_choice("yaml", "yaml format", 'y', "yaml"),
                    inspect_choice("yaml", "yaml with color styles", 'u', "yaml+"),
                    inspect_choice("json", "json format", 'j', "json"),
                    inspect_choice("json", "json with color styles", 'k', "json+"),
                ];
                view.insert_dialog(
                    "inspect-format",
                    Dialog::Choice(ChoiceList::new("Output format", formats)),
                );
            }
            InspectRequest::PickStyle(format) => {
                let styles = highlight::styles()
                    .into_iter()
                    .map(|style| ChoiceItem {
                        label: style.clone(),
                        description: String::new(),
                        shortcut: None,
                        effect: ChoiceEffect::Action {
                            name: INSPECT.name.to_string(),
                            argument: Some(format!("{format}:{style}")),
                        },
                    })
                    .collect();
                view.insert_dialog(
                    "inspect-color",
                    Dialog::Choice(ChoiceList::new("Color style", styles)),
                );
            }
            InspectRequest::Render { format, style } => {
                let kind = view.resource_kind();
                let rio_type = rio_type(&kind);
                view.dispatch(Command::Capture {
                    invocation: self
                        .rio()
                        .args(["inspect", "--format", format, "-t", rio_type, name]),
                    title: format!("inspect {rio_type} {name}"),
                    style: style.map(ToString::to_string),
                });
            }
        }
    }

    fn logs(&self, container: Option<&str>, name: &str, view: &mut dyn ViewHandle) {
        if container.is_none() && view.resource_kind() == SERVICES {
            view.dispatch(Command::PickContainer {
                target: name.to_string(),
                selector: service_selector(name),
                purpose: ContainerPurpose::Logs,
            });
            return;
        }
        let container = container.filter(|container| !container.is_empty());
        view.dispatch(Command::Follow {
            invocation: self
                .rio()
                .args(["logs", "-f"])
                .opt_arg("-c", container)
                .arg(name),
            title: format!("logs - ({name})"),
        });
    }

    fn exec(&self, container: Option<&str>, name: &str, view: &mut dyn ViewHandle) {
        if container.is_none() && view.resource_kind() == SERVICES {
            view.dispatch(Command::PickContainer {
                target: name.to_string(),
                selector: service_selector(name),
                purpose: ContainerPurpose::Exec,
            });
            return;
        }
        let container = container.filter(|container| !container.is_empty());
        view.dispatch(Command::Interactive {
            invocation: self
                .rio()
                .args(["exec", "-it"])
                .opt_arg("-c", container)
                .arg(name)
                .args(["/bin/sh", "-c", SHELL_BOOTSTRAP]),
            label: format!("exec {name}"),
        });
    }

    fn delete(&self, name: &str, view: &mut dyn ViewHandle) {
        let kind = view.resource_kind();
        let rio_type = rio_type(&kind);
        let command = Command::Mutate {
            invocation: self.rio().args(["rm", "-t", rio_type, name]),
            label: format!("delete {rio_type} {name}"),
        };
        view.insert_dialog(
            "delete",
            Dialog::Confirm(Confirm::new(
                format!("Do you want to delete {rio_type} {name}?"),
                "Delete",
                command,
            )),
        );
    }

    fn pods(&self, name: &str, view: &mut dyn ViewHandle) {
        if view.resource_kind() != SERVICES {
            return;
        }
        let handler: Arc<dyn EventHandler> = Arc::new(RioHandler {
            rio: self.rio.clone(),
        });
        view.push_nested(list_view(
            &self.rio,
            ResourceKind::new("Pods", PODS),
            &["ps", "-c", name],
            vec![INSPECT, LOGS, EXEC],
            handler,
        ));
    }
}

impl EventHandler for RioHandler {
    fn on_key(&self, key: KeyEvent, view: &mut dyn ViewHandle) -> bool {
        if key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) {
            return false;
        }
        let KeyCode::Char(c) = key.code else {
            return false;
        };
        let Some(action) = view.actions().into_iter().find(|action| action.shortcut == c) else {
            return false;
        };
        // direct keys skip the format and container pickers
        let argument = match action.name {
            "inspect" => Some("yaml"),
            "logs" | "exec" => Some(""),
            _ => None,
        };
        self.on_action(action.name, argument, view);
        true
    }

    fn on_action(&self, action: &str, argument: Option<&str>, view: &mut dyn ViewHandle) {
        let Some(name) = view.selection_name() else {
            view.update_status("nothing selected", true);
            return;
        };
        match action {
            "inspect" => self.inspect(argument, &name, view),
            "edit" => view.dispatch(Command::Interactive {
                invocation: self.rio().args(["edit", name.as_str()]),
                label: format!("edit {name}"),
            }),
            "logs" => self.logs(argument, &name, view),
            "exec" => self.exec(argument, &name, view),
            "delete" => self.delete(&name, view),
            "pods" => self.pods(&name, view),
            _ => {}
        }
    }
}
