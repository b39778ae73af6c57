use crate::datasource::RefreshError;
use anyhow::{Context, Result};
use k8s_openapi::api::core::v1::Pod;
use kube::api::ListParams;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::discovery::{Discovery, Scope, verbs};
use kube::{Api, Client, Config};
use std::path::Path;
use tracing::{debug, info};

const DISCOVERY_EXCLUDES: [&str; 2] = ["metrics.k8s.io", "events.k8s.io"];

pub async fn connect(kubeconfig: Option<&Path>) -> Result<Client> {
    let config = match kubeconfig.filter(|path| path.exists()) {
        Some(path) => {
            let kubeconfig = Kubeconfig::read_from(path)
                .with_context(|| format!("failed to read kubeconfig {}", path.display()))?;
            Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                .await
                .context("failed to load Kubernetes configuration")?
        }
        None => Config::infer()
            .await
            .context("failed to infer Kubernetes configuration")?,
    };
    info!(cluster = %config.cluster_url, "connecting to cluster");
    Client::try_from(config).context("failed to initialize Kubernetes client")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResourceRow {
    pub name: String,
    pub group_version: String,
    pub namespaced: bool,
}

pub async fn api_resources(client: Client) -> Result<String, RefreshError> {
    let discovery = Discovery::new(client)
        .exclude(&DISCOVERY_EXCLUDES)
        .run()
        .await
        .map_err(|error| RefreshError::Api(format!("discovery: {error}")))?;

    let rows = discovery
        .groups()
        .flat_map(|group| {
            group
                .recommended_resources()
                .into_iter()
                .filter(|(_, caps)| caps.supports_operation(verbs::LIST))
                .map(|(resource, caps)| ApiResourceRow {
                    name: resource.plural,
                    group_version: resource.api_version,
                    namespaced: matches!(caps.scope, Scope::Namespaced),
                })
        })
        .collect::<Vec<_>>();
    debug!(resources = rows.len(), "discovered api resources");
    Ok(render_api_resources(rows))
}

pub fn render_api_resources(mut rows: Vec<ApiResourceRow>) -> String {
    rows.sort_by(|a, b| {
        a.name
            .cmp(&b.name)
            .then_with(|| a.group_version.cmp(&b.group_version))
    });
    let mut out = String::from("NAME\tGROUPVERSION\tNAMESPACED\n");
    for row in rows {
        out.push_str(&format!(
            "{}\t{}\t{}\n",
            row.name, row.group_version, row.namespaced
        ));
    }
    out
}

pub fn resource_arg(plural: &str, group_version: &str) -> String {
    match group_version.split_once('/') {
        Some((group, _)) if !group.is_empty() => format!("{plural}.{group}"),
        _ => plural.to_string(),
    }
}

pub async fn list_containers(client: Client, selector: &str) -> Result<Vec<String>> {
    let pods: Api<Pod> = Api::all(client);
    let list = pods
        .list(&ListParams::default().labels(selector))
        .await
        .with_context(|| format!("failed to list pods matching {selector}"))?;
    Ok(container_names(&list.items))
}

fn container_names(pods: &[Pod]) -> Vec<String> {
    let mut names = Vec::<String>::new();
    for spec in pods.iter().filter_map(|pod| pod.spec.as_ref()) {
        let init = spec.init_containers.iter().flatten();
        for container in spec.containers.iter().chain(init) {
            if !names.contains(&container.name) {
                names.push(container.name.clone());
            }
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;
    use k8s_openapi::api::core::v1::{Container, PodSpec};

    fn pod(containers: &[&str], init: &[&str]) -> Pod {
        let container = |name: &&str| Container {
            name: name.to_string(),
            ..Container::default()
        };
        Pod {
            spec: Some(PodSpec {
                containers: containers.iter().map(container).collect(),
                init_containers: (!init.is_empty()).then(|| init.iter().map(container).collect()),
                ..PodSpec::default()
            }),
            ..Pod::default()
        }
    }

    #[test]
    fn api_resource_table_is_sorted_and_tab_separated() {
        let raw = render_api_resources(vec![
            ApiResourceRow {
                name: "pods".to_string(),
                group_version: "v1".to_string(),
                namespaced: true,
            },
            ApiResourceRow {
                name: "deployments".to_string(),
                group_version: "apps/v1".to_string(),
                namespaced: true,
            },
            ApiResourceRow {
                name: "nodes".to_string(),
                group_version: "v1".to_string(),
                namespaced: false,
            },
        ]);
        let grid = Grid::parse(&raw);
        assert_eq!(grid.header, vec!["NAME", "GROUPVERSION", "NAMESPACED"]);
        assert_eq!(
            grid.rows,
            vec![
                vec!["deployments", "apps/v1", "true"],
                vec!["nodes", "v1", "false"],
                vec!["pods", "v1", "true"],
            ]
        );
    }

    #[test]
    fn resource_arg_qualifies_non_core_groups() {
        assert_eq!(resource_arg("deployments", "apps/v1"), "deployments.apps");
        assert_eq!(resource_arg("pods", "v1"), "pods");
    }

    #[test]
    fn containers_come_before_init_containers_without_duplicates() {
        let pods = vec![pod(&["web", "sidecar"], &["migrate"]), pod(&["web", "sidecar"], &["migrate"])];
        assert_eq!(container_names(&pods), vec!["web", "sidecar", "migrate"]);
    }
}
