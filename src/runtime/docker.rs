use std::collections::HashMap;

use bollard::container::{
    InspectContainerOptions, KillContainerOptions, ListContainersOptions, LogOutput, LogsOptions,
    PruneContainersOptions, RemoveContainerOptions, RestartContainerOptions, Stats, StatsOptions,
    StopContainerOptions,
};
use bollard::image::{ListImagesOptions, PruneImagesOptions, RemoveImageOptions};
use bollard::models::{ContainerSummary, EventMessage, ImageSummary, Volume};
use bollard::network::{InspectNetworkOptions, ListNetworksOptions, PruneNetworksOptions};
use bollard::system::EventsOptions;
use bollard::volume::{ListVolumesOptions, PruneVolumesOptions, RemoveVolumeOptions};
use bollard::{Docker, API_DEFAULT_VERSION};
use futures_util::StreamExt;

use crate::demux::{encode_frame, ByteStream, StreamKind};
use crate::error::{Result, RuntimeError};
use crate::model::{
    ContainerInfo, DaemonEvent, DaemonSummary, DiskUsage, ImageInfo, InspectKind, NetworkInfo,
    NodeInfo, ServiceInfo, StatSample, TaskInfo, TaskScope, UsageKind, UsageRow, VolumeInfo,
};
use crate::view::format_bytes;

use super::swarm::SwarmCli;
use super::{EventStream, LogRequest, LogSource, Operation, Runtime, StatStream};

const CONNECT_TIMEOUT_SECS: u64 = 120;
const STOP_TIMEOUT_SECS: i64 = 10;

/// Wrapper around bollard's Docker client, plus the `docker` CLI for Swarm.
pub struct DockerClient {
    client: Docker,
    swarm: SwarmCli,
}

impl DockerClient {
    /// Connect to `host` (`unix://`, `tcp://` or `http://`), or to the local
    /// defaults when none is given. Does not contact the daemon.
    pub fn connect(host: Option<&str>) -> Result<Self> {
        let client = match host {
            None => Docker::connect_with_local_defaults()?,
            Some(h) if h.starts_with("unix://") => {
                Docker::connect_with_unix(h, CONNECT_TIMEOUT_SECS, API_DEFAULT_VERSION)?
            }
            Some(h) if h.starts_with("tcp://") || h.starts_with("http://") => {
                Docker::connect_with_http(h, CONNECT_TIMEOUT_SECS, API_DEFAULT_VERSION)?
            }
            Some(h) => return Err(RuntimeError::Invalid(format!("unsupported host {h}"))),
        };
        Ok(Self {
            client,
            swarm: SwarmCli::new(host.map(str::to_owned)),
        })
    }

    async fn remove_image(&self, id: &str, force: bool) -> Result<String> {
        let options = RemoveImageOptions { force, noprune: false };
        let deleted = self.client.remove_image(id, Some(options), None).await?;
        Ok(format!("{} layers", deleted.len()))
    }

    async fn prune_dangling_images(&self) -> Result<i64> {
        let mut filters = HashMap::new();
        filters.insert("dangling", vec!["true"]);
        let resp = self.client.prune_images(Some(PruneImagesOptions { filters })).await?;
        Ok(resp.space_reclaimed.unwrap_or(0))
    }

    async fn prune_all(&self) -> Result<i64> {
        let containers = self
            .client
            .prune_containers(None::<PruneContainersOptions<String>>)
            .await?;
        let images = self.prune_dangling_images().await?;
        let volumes = self
            .client
            .prune_volumes(None::<PruneVolumesOptions<String>>)
            .await?;
        self.client
            .prune_networks(None::<PruneNetworksOptions<String>>)
            .await?;
        Ok(containers.space_reclaimed.unwrap_or(0)
            + images
            + volumes.space_reclaimed.unwrap_or(0))
    }
}

impl Runtime for DockerClient {
    async fn ping(&self) -> Result<()> {
        self.client.ping().await?;
        Ok(())
    }

    async fn summary(&self) -> Result<DaemonSummary> {
        let version = self.client.version().await?;
        let info = self.client.info().await?;
        let swarm_role = match info.swarm.as_ref() {
            Some(s) if s.local_node_state.as_ref().map(|st| st.to_string()).as_deref() == Some("active") => {
                if s.control_available.unwrap_or(false) { "manager" } else { "worker" }
            }
            _ => "inactive",
        };
        Ok(DaemonSummary {
            version: version.version.unwrap_or_default(),
            api_version: version.api_version.unwrap_or_default(),
            os: version.os.unwrap_or_default(),
            arch: version.arch.unwrap_or_default(),
            host: info.name.unwrap_or_default(),
            swarm_role: swarm_role.to_string(),
            containers_running: info.containers_running.unwrap_or(0),
            containers_total: info.containers.unwrap_or(0),
            images: info.images.unwrap_or(0),
        })
    }

    async fn info_json(&self) -> Result<String> {
        let info = self.client.info().await?;
        Ok(serde_json::to_string_pretty(&info)?)
    }

    async fn list_containers(&self, all: bool) -> Result<Vec<ContainerInfo>> {
        let options: ListContainersOptions<String> = ListContainersOptions {
            all,
            ..Default::default()
        };
        let summaries = self.client.list_containers(Some(options)).await?;
        Ok(summaries.iter().map(summary_to_info).collect())
    }

    async fn list_images(&self) -> Result<Vec<ImageInfo>> {
        let options: ListImagesOptions<String> = ListImagesOptions {
            all: false,
            ..Default::default()
        };
        let images = self.client.list_images(Some(options)).await?;
        Ok(images.iter().map(image_to_info).collect())
    }

    async fn list_networks(&self) -> Result<Vec<NetworkInfo>> {
        let networks = self
            .client
            .list_networks(None::<ListNetworksOptions<String>>)
            .await?;
        Ok(networks
            .into_iter()
            .map(|n| NetworkInfo {
                id: short_id(&n.id.unwrap_or_default()),
                name: n.name.unwrap_or_default(),
                driver: n.driver.unwrap_or_default(),
                scope: n.scope.unwrap_or_default(),
                internal: n.internal.unwrap_or(false),
            })
            .collect())
    }

    async fn list_volumes(&self) -> Result<Vec<VolumeInfo>> {
        let resp = self
            .client
            .list_volumes(None::<ListVolumesOptions<String>>)
            .await?;
        Ok(resp
            .volumes
            .unwrap_or_default()
            .into_iter()
            .map(|v| VolumeInfo {
                scope: v.scope.map(|s| s.to_string()).unwrap_or_default(),
                name: v.name,
                driver: v.driver,
                mountpoint: v.mountpoint,
            })
            .collect())
    }

    async fn disk_usage(&self) -> Result<DiskUsage> {
        let df = self.client.df().await?;
        Ok(DiskUsage {
            images: df.images.unwrap_or_default().iter().map(image_usage).collect(),
            containers: df
                .containers
                .unwrap_or_default()
                .iter()
                .map(container_usage)
                .collect(),
            volumes: df.volumes.unwrap_or_default().iter().map(volume_usage).collect(),
            build_cache: df
                .build_cache
                .unwrap_or_default()
                .into_iter()
                .map(|b| {
                    let in_use = b.in_use.unwrap_or(false);
                    let size = b.size.unwrap_or(0);
                    let id = b.id.unwrap_or_default();
                    UsageRow {
                        kind: UsageKind::BuildCache,
                        name: b
                            .description
                            .filter(|d| !d.is_empty())
                            .unwrap_or_else(|| short_id(&id)),
                        id,
                        active: if in_use { "yes" } else { "no" }.to_string(),
                        size,
                        reclaimable: if in_use { 0 } else { size },
                    }
                })
                .collect(),
        })
    }

    async fn list_nodes(&self) -> Result<Vec<NodeInfo>> {
        self.swarm.list_nodes().await
    }

    async fn list_services(&self) -> Result<Vec<ServiceInfo>> {
        self.swarm.list_services().await
    }

    async fn tasks_of(&self, scope: &TaskScope) -> Result<Vec<TaskInfo>> {
        self.swarm.tasks_of(scope).await
    }

    async fn inspect(&self, kind: InspectKind, id: &str) -> Result<String> {
        let json = match kind {
            InspectKind::Container => serde_json::to_string_pretty(
                &self
                    .client
                    .inspect_container(id, None::<InspectContainerOptions>)
                    .await?,
            )?,
            InspectKind::Image => {
                serde_json::to_string_pretty(&self.client.inspect_image(id).await?)?
            }
            InspectKind::Network => serde_json::to_string_pretty(
                &self
                    .client
                    .inspect_network(id, None::<InspectNetworkOptions<String>>)
                    .await?,
            )?,
            InspectKind::Volume => {
                serde_json::to_string_pretty(&self.client.inspect_volume(id).await?)?
            }
            InspectKind::Node | InspectKind::Service | InspectKind::Task => {
                self.swarm.inspect(kind.label(), id).await?
            }
        };
        Ok(json)
    }

    fn logs(&self, request: &LogRequest) -> ByteStream {
        match &request.source {
            LogSource::Service(id) => {
                self.swarm
                    .service_logs(id, request.since, request.tail, request.follow)
            }
            LogSource::Container(id) => {
                let options: LogsOptions<String> = LogsOptions {
                    stdout: true,
                    stderr: true,
                    follow: request.follow,
                    since: request.since,
                    tail: request.tail.to_string(),
                    ..Default::default()
                };
                // bollard already splits frames; re-encode so every log source
                // reaches the pager through the same demultiplexer.
                let stream = self.client.logs(id, Some(options)).filter_map(|item| async move {
                    match item {
                        Ok(LogOutput::StdOut { message } | LogOutput::Console { message }) => {
                            Some(Ok(encode_frame(StreamKind::Stdout, &message)))
                        }
                        Ok(LogOutput::StdErr { message }) => {
                            Some(Ok(encode_frame(StreamKind::Stderr, &message)))
                        }
                        Ok(LogOutput::StdIn { .. }) => None,
                        Err(err) => Some(Err(RuntimeError::from(err))),
                    }
                });
                Box::pin(stream)
            }
        }
    }

    fn stats(&self, id: &str) -> StatStream {
        let options = StatsOptions {
            stream: true,
            one_shot: false,
        };
        let stream = self
            .client
            .stats(id, Some(options))
            .map(|item| item.map(|s| stats_to_sample(&s)).map_err(RuntimeError::from));
        Box::pin(stream)
    }

    fn events(&self) -> EventStream {
        let stream = self
            .client
            .events(None::<EventsOptions<String>>)
            .map(|item| item.map(event_to_model).map_err(RuntimeError::from));
        Box::pin(stream)
    }

    async fn execute(&self, op: &Operation) -> Result<String> {
        tracing::info!(?op, "executing");
        match op {
            Operation::KillContainer(id) => {
                self.client
                    .kill_container(id, None::<KillContainerOptions<String>>)
                    .await?;
            }
            Operation::StopContainer(id) => {
                let options = StopContainerOptions { t: STOP_TIMEOUT_SECS };
                self.client.stop_container(id, Some(options)).await?;
            }
            Operation::RestartContainer(id) => {
                let options = RestartContainerOptions { t: STOP_TIMEOUT_SECS as isize };
                self.client.restart_container(id, Some(options)).await?;
            }
            Operation::RemoveContainer(id) => {
                let options = RemoveContainerOptions {
                    force: true,
                    ..Default::default()
                };
                self.client.remove_container(id, Some(options)).await?;
            }
            Operation::RemoveStoppedContainers => {
                let resp = self
                    .client
                    .prune_containers(None::<PruneContainersOptions<String>>)
                    .await?;
                let count = resp.containers_deleted.map_or(0, |d| d.len());
                return Ok(format!("{count} removed"));
            }
            Operation::RemoveImage { id, force } => return self.remove_image(id, *force).await,
            Operation::RemoveDanglingImages => {
                let reclaimed = self.prune_dangling_images().await?;
                return Ok(format!("reclaimed {}", format_bytes(reclaimed.max(0) as u64)));
            }
            Operation::RemoveNetwork(id) => self.client.remove_network(id).await?,
            Operation::RemoveVolume(name) => {
                self.client
                    .remove_volume(name, None::<RemoveVolumeOptions>)
                    .await?;
            }
            Operation::Prune => {
                let reclaimed = self.prune_all().await?;
                return Ok(format!("reclaimed {}", format_bytes(reclaimed.max(0) as u64)));
            }
            Operation::SetNodeAvailability { id, availability } => {
                self.swarm.set_node_availability(id, *availability).await?;
            }
            Operation::ScaleService { id, replicas } => {
                self.swarm.scale_service(id, *replicas).await?;
            }
            Operation::ForceUpdateService(id) => self.swarm.force_update_service(id).await?,
            Operation::RemoveService(id) => self.swarm.remove_services(&[id.as_str()]).await?,
            Operation::RemoveStack(name) => {
                let count = self.swarm.remove_stack(name).await?;
                return Ok(format!("{count} services"));
            }
        }
        Ok(String::new())
    }
}

// --- Free helper functions ---

fn short_id(id: &str) -> String {
    id.trim_start_matches("sha256:").chars().take(12).collect()
}

fn summary_to_info(s: &ContainerSummary) -> ContainerInfo {
    let id = short_id(s.id.as_deref().unwrap_or_default());

    let name = s
        .names
        .as_ref()
        .and_then(|n| n.first())
        .map(|n| n.trim_start_matches('/').to_string())
        .unwrap_or_else(|| id.clone());

    ContainerInfo {
        name,
        image: s.image.clone().unwrap_or_default(),
        command: s.command.clone().unwrap_or_default(),
        state: s.state.clone().unwrap_or_default(),
        status: s.status.clone().unwrap_or_default(),
        created: s.created.unwrap_or(0),
        ports: format_ports(s),
        ip_address: extract_ip(s),
        id,
    }
}

fn image_tag(repo_tags: &[String]) -> String {
    repo_tags
        .first()
        .cloned()
        .unwrap_or_else(|| "<none>:<none>".to_string())
}

fn image_to_info(img: &ImageSummary) -> ImageInfo {
    ImageInfo {
        id: short_id(&img.id),
        tag: image_tag(&img.repo_tags),
        created: img.created,
        size: img.size,
        containers: img.containers,
    }
}

fn image_usage(img: &ImageSummary) -> UsageRow {
    let in_use = img.containers > 0;
    UsageRow {
        kind: UsageKind::Images,
        id: short_id(&img.id),
        name: image_tag(&img.repo_tags),
        active: if in_use { img.containers.to_string() } else { "0".to_string() },
        size: img.size,
        reclaimable: if in_use { 0 } else { img.size },
    }
}

fn container_usage(c: &ContainerSummary) -> UsageRow {
    let info = summary_to_info(c);
    let size = c.size_rw.unwrap_or(0);
    UsageRow {
        kind: UsageKind::Containers,
        reclaimable: if info.is_running() { 0 } else { size },
        active: info.state.clone(),
        id: info.id,
        name: info.name,
        size,
    }
}

fn volume_usage(v: &Volume) -> UsageRow {
    let (size, refs) = v
        .usage_data
        .as_ref()
        .map_or((0, 0), |u| (u.size.max(0), u.ref_count));
    UsageRow {
        kind: UsageKind::Volumes,
        id: v.name.clone(),
        name: v.name.clone(),
        active: refs.to_string(),
        size,
        reclaimable: if refs > 0 { 0 } else { size },
    }
}

fn format_ports(s: &ContainerSummary) -> String {
    let Some(ports) = &s.ports else { return String::new() };
    let mut parts = Vec::new();
    for p in ports {
        let proto = p
            .typ
            .as_ref()
            .map(|t| t.to_string())
            .unwrap_or_else(|| "tcp".to_string());
        match (&p.ip, p.public_port) {
            (Some(ip), Some(public)) => {
                parts.push(format!("{}:{}->{}/{}", ip, public, p.private_port, proto))
            }
            _ => parts.push(format!("{}/{}", p.private_port, proto)),
        }
    }
    parts.dedup();
    parts.join(", ")
}

fn extract_ip(s: &ContainerSummary) -> String {
    s.network_settings
        .as_ref()
        .and_then(|settings| settings.networks.as_ref())
        .and_then(|networks| {
            networks
                .values()
                .filter_map(|endpoint| endpoint.ip_address.clone())
                .find(|ip| !ip.is_empty())
        })
        .unwrap_or_default()
}

fn calculate_cpu_percent(stats: &Stats) -> f64 {
    let cpu_stats = &stats.cpu_stats;
    let precpu_stats = &stats.precpu_stats;

    let cpu_delta =
        cpu_stats.cpu_usage.total_usage as f64 - precpu_stats.cpu_usage.total_usage as f64;
    let system_delta = cpu_stats.system_cpu_usage.unwrap_or(0) as f64
        - precpu_stats.system_cpu_usage.unwrap_or(0) as f64;

    if system_delta > 0.0 && cpu_delta > 0.0 {
        let num_cpus = cpu_stats.online_cpus.unwrap_or(1) as f64;
        (cpu_delta / system_delta) * num_cpus * 100.0
    } else {
        0.0
    }
}

fn stats_to_sample(stats: &Stats) -> StatSample {
    let (net_rx, net_tx) = stats
        .networks
        .as_ref()
        .map(|nets| {
            nets.values()
                .fold((0, 0), |(rx, tx), n| (rx + n.rx_bytes, tx + n.tx_bytes))
        })
        .unwrap_or((0, 0));

    let (block_read, block_write) = stats
        .blkio_stats
        .io_service_bytes_recursive
        .as_ref()
        .map(|entries| {
            entries.iter().fold((0, 0), |(r, w), e| {
                match e.op.to_ascii_lowercase().as_str() {
                    "read" => (r + e.value, w),
                    "write" => (r, w + e.value),
                    _ => (r, w),
                }
            })
        })
        .unwrap_or((0, 0));

    StatSample {
        cpu_percent: calculate_cpu_percent(stats),
        mem_usage: stats.memory_stats.usage.unwrap_or(0),
        mem_limit: stats.memory_stats.limit.unwrap_or(0),
        net_rx,
        net_tx,
        block_read,
        block_write,
        pids: stats.pids_stats.current.unwrap_or(0),
    }
}

fn event_to_model(event: EventMessage) -> DaemonEvent {
    let (actor_id, actor_name) = event
        .actor
        .map(|actor| {
            let name = actor
                .attributes
                .as_ref()
                .and_then(|attrs| attrs.get("name"))
                .cloned()
                .unwrap_or_default();
            (actor.id.unwrap_or_default(), name)
        })
        .unwrap_or_default();
    DaemonEvent {
        time: event.time.unwrap_or(0),
        kind: event.typ.map(|t| t.to_string()).unwrap_or_default(),
        action: event.action.unwrap_or_default(),
        actor_id,
        actor_name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_id_strips_digest_prefix() {
        assert_eq!(short_id("sha256:0123456789abcdef"), "0123456789ab");
        assert_eq!(short_id("abc"), "abc");
    }

    #[test]
    fn untagged_image_is_dangling() {
        assert_eq!(image_tag(&[]), "<none>:<none>");
        assert_eq!(image_tag(&["nginx:1.27".to_string()]), "nginx:1.27");
    }

    #[test]
    fn unsupported_host_scheme_is_rejected() {
        let err = DockerClient::connect(Some("ssh://example")).err();
        assert!(matches!(err, Some(RuntimeError::Invalid(_))));
    }
}
