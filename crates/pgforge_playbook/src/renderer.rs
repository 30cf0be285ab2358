//! Playbook rendering.

use serde_yaml::{Mapping, Value};
use tracing::debug;

use pgforge_spec::{GenerationRequest, REPLICA_CEILING};

use crate::error::{PlaybookError, PlaybookResult};
use crate::settings::{PlaybookSettings, ReplicationMode};
use crate::task::{mapping, text, Play, Task};

/// Inventory group of the primary node.
pub const PRIMARY_GROUP: &str = "postgres_primary";

/// Inventory group prefix of replica nodes; replica `i` lives in `postgres_replica_<i>`.
pub const REPLICA_GROUP_PREFIX: &str = "postgres_replica_";

const RESTART_HANDLER: &str = "restart postgresql";
/// Private address of the primary, from the facts gathered by its play. The
/// SSH address (`ansible_host`) is usually public and outside the cluster
/// network that pg_hba.conf and the security group admit.
const PRIMARY_ADDRESS: &str =
    "{{ hostvars[groups['postgres_primary'][0]]['ansible_default_ipv4']['address'] }}";
const PGDG_KEY_URL: &str = "https://www.postgresql.org/media/keys/ACCC4CF8.asc";
const PGDG_REPO: &str =
    "deb http://apt.postgresql.org/pub/repos/apt {{ ansible_distribution_release }}-pgdg main";

/// Renders the Ansible playbook for a PostgreSQL cluster.
///
/// The playbook holds one play for the primary followed by one play per
/// replica. Replica plays are built from the same task list, differing only
/// in their host group.
#[derive(Debug, Clone, Default)]
pub struct PlaybookRenderer {
    settings: PlaybookSettings,
}

impl PlaybookRenderer {
    /// Create a renderer, rejecting unusable settings.
    pub fn new(settings: PlaybookSettings) -> PlaybookResult<Self> {
        settings.check()?;
        Ok(Self { settings })
    }

    pub fn settings(&self) -> &PlaybookSettings {
        &self.settings
    }

    /// Build the plays for a validated request.
    pub fn plays(&self, request: &GenerationRequest) -> PlaybookResult<Vec<Play>> {
        if request.num_replicas() > REPLICA_CEILING {
            return Err(PlaybookError::Render(format!(
                "{} replicas exceeds the ceiling of {}",
                request.num_replicas(),
                REPLICA_CEILING
            )));
        }

        let cluster = Cluster::new(request, &self.settings);
        let mut plays = Vec::with_capacity(request.node_count() as usize);
        plays.push(cluster.primary_play());
        for i in 1..=request.num_replicas() {
            plays.push(cluster.replica_play(i));
        }
        Ok(plays)
    }

    /// Render `playbook.yml` for a validated request.
    pub fn render(&self, request: &GenerationRequest) -> PlaybookResult<String> {
        let plays = self.plays(request)?;
        let body = serde_yaml::to_string(&plays)?;

        // Round-trip the document so a broken emitter never reaches disk.
        let parsed: Vec<Value> = serde_yaml::from_str(&body)?;
        if parsed.len() != plays.len() {
            return Err(PlaybookError::Render(format!(
                "expected {} plays, rendered {}",
                plays.len(),
                parsed.len()
            )));
        }

        debug!(
            "Rendered playbook with {} play(s), replication {}",
            plays.len(),
            self.settings.replication
        );

        Ok(format!(
            "---\n# PostgreSQL {} cluster: 1 primary, {} replica(s), {} replication\n\
             # Generated by pgforge. Do not edit by hand.\n{}",
            request.postgres_version(),
            request.num_replicas(),
            self.settings.replication,
            body
        ))
    }
}

/// Per-request values shared by every play.
struct Cluster<'a> {
    request: &'a GenerationRequest,
    settings: &'a PlaybookSettings,
    release: String,
}

impl<'a> Cluster<'a> {
    fn new(request: &'a GenerationRequest, settings: &'a PlaybookSettings) -> Self {
        Self {
            request,
            settings,
            release: request.postgres_version().release(),
        }
    }

    fn streaming(&self) -> bool {
        self.settings.replication == ReplicationMode::Streaming
    }

    fn config_dir(&self) -> String {
        format!("/etc/postgresql/{}/main", self.release)
    }

    fn data_dir(&self) -> String {
        format!("/var/lib/postgresql/{}/main", self.release)
    }

    fn vars(&self) -> Mapping {
        let mut vars = mapping([
            ("pg_version", text(self.request.postgres_version().as_str())),
            ("pg_release", text(&self.release)),
        ]);
        if self.streaming() {
            vars.insert(text("pg_replication_user"), text(&self.settings.replication_user));
            vars.insert(
                text("pg_replication_password"),
                text("{{ lookup('env', 'PG_REPLICATION_PASSWORD') }}"),
            );
        }
        vars
    }

    fn primary_play(&self) -> Play {
        let mut tasks = self.install_tasks();
        tasks.push(self.tune_task());
        if self.streaming() {
            tasks.push(self.hba_task());
        }
        tasks.push(start_task());
        if self.streaming() {
            tasks.push(self.replication_role_task());
        }

        Play::new("Provision PostgreSQL primary", PRIMARY_GROUP)
            .with_vars(self.vars())
            .with_tasks(tasks)
            .with_handler(restart_handler())
    }

    fn replica_play(&self, index: u32) -> Play {
        let mut tasks = self.install_tasks();
        tasks.push(self.tune_task());
        if self.streaming() {
            tasks.extend(self.clone_tasks());
        }
        tasks.push(start_task());

        Play::new(
            format!("Provision PostgreSQL replica {}", index),
            format!("{}{}", REPLICA_GROUP_PREFIX, index),
        )
        .with_vars(self.vars())
        .with_tasks(tasks)
        .with_handler(restart_handler())
    }

    fn install_tasks(&self) -> Vec<Task> {
        vec![
            Task::new(
                "Install repository prerequisites",
                "apt",
                mapping([
                    ("name", Value::Sequence(vec![text("ca-certificates"), text("gnupg")])),
                    ("state", text("present")),
                    ("update_cache", Value::Bool(true)),
                ]),
            ),
            Task::new(
                "Add PostgreSQL apt signing key",
                "apt_key",
                mapping([("url", text(PGDG_KEY_URL)), ("state", text("present"))]),
            ),
            Task::new(
                "Add PostgreSQL apt repository",
                "apt_repository",
                mapping([("repo", text(PGDG_REPO)), ("state", text("present"))]),
            ),
            Task::new(
                format!("Install PostgreSQL {}", self.request.postgres_version()),
                "apt",
                mapping([
                    (
                        "name",
                        Value::Sequence(vec![
                            text(format!("postgresql-{}", self.release)),
                            text("python3-psycopg2"),
                        ]),
                    ),
                    ("state", text("present")),
                    ("update_cache", Value::Bool(true)),
                ]),
            ),
        ]
    }

    fn settings_items(&self) -> Value {
        let mut items = vec![
            ("max_connections", self.request.max_connections().to_string()),
            ("shared_buffers", self.request.shared_buffers().postgres_setting()),
            ("listen_addresses", format!("'{}'", self.settings.listen_addresses)),
        ];
        if self.streaming() {
            items.push(("wal_level", "replica".to_string()));
            items.push(("max_wal_senders", (self.request.num_replicas() + 2).to_string()));
            items.push(("hot_standby", "true".to_string()));
        }

        Value::Sequence(
            items
                .into_iter()
                .map(|(key, value)| Value::Mapping(mapping([("key", text(key)), ("value", text(value))])))
                .collect(),
        )
    }

    fn tune_task(&self) -> Task {
        Task::new(
            "Set PostgreSQL server parameters",
            "lineinfile",
            mapping([
                ("path", text(format!("{}/postgresql.conf", self.config_dir()))),
                ("regexp", text("^#?\\s*{{ item.key }}\\s*=")),
                ("line", text("{{ item.key }} = {{ item.value }}")),
            ]),
        )
        .keyword("loop", self.settings_items())
        .notify(RESTART_HANDLER)
    }

    fn hba_task(&self) -> Task {
        Task::new(
            "Allow replication connections",
            "lineinfile",
            mapping([
                ("path", text(format!("{}/pg_hba.conf", self.config_dir()))),
                (
                    "line",
                    text(format!(
                        "host replication {} {} md5",
                        self.settings.replication_user, self.settings.replication_cidr
                    )),
                ),
                ("state", text("present")),
            ]),
        )
        .notify(RESTART_HANDLER)
    }

    fn replication_role_task(&self) -> Task {
        Task::new(
            "Create replication role",
            "community.postgresql.postgresql_user",
            mapping([
                ("name", text("{{ pg_replication_user }}")),
                ("password", text("{{ pg_replication_password }}")),
                ("role_attr_flags", text("REPLICATION,LOGIN")),
            ]),
        )
        .become_user("postgres")
    }

    fn clone_tasks(&self) -> Vec<Task> {
        let data_dir = self.data_dir();
        let not_cloned = "not standby_marker.stat.exists";
        // pg_basebackup -R writes recovery.conf before 12 and standby.signal after.
        let marker = if self.request.postgres_version().major() >= 12 {
            "standby.signal"
        } else {
            "recovery.conf"
        };

        vec![
            Task::new(
                "Check whether this node already follows the primary",
                "stat",
                mapping([("path", text(format!("{}/{}", data_dir, marker)))]),
            )
            .register("standby_marker"),
            Task::new(
                "Stop PostgreSQL before cloning",
                "service",
                mapping([("name", text("postgresql")), ("state", text("stopped"))]),
            )
            .when(not_cloned),
            Task::new(
                "Remove the initial data directory",
                "file",
                mapping([("path", text(&data_dir)), ("state", text("absent"))]),
            )
            .when(not_cloned),
            Task::new(
                "Clone the primary with pg_basebackup",
                "command",
                mapping([(
                    "argv",
                    Value::Sequence(
                        [
                            "pg_basebackup",
                            "-h",
                            PRIMARY_ADDRESS,
                            "-U",
                            "{{ pg_replication_user }}",
                            "-D",
                            data_dir.as_str(),
                            "-X",
                            "stream",
                            "-R",
                        ]
                        .into_iter()
                        .map(text)
                        .collect(),
                    ),
                )]),
            )
            .keyword(
                "environment",
                Value::Mapping(mapping([("PGPASSWORD", text("{{ pg_replication_password }}"))])),
            )
            .become_user("postgres")
            .when(not_cloned),
        ]
    }
}

fn start_task() -> Task {
    Task::new(
        "Start and enable PostgreSQL",
        "service",
        mapping([
            ("name", text("postgresql")),
            ("state", text("started")),
            ("enabled", Value::Bool(true)),
        ]),
    )
}

fn restart_handler() -> Task {
    Task::new(
        RESTART_HANDLER,
        "service",
        mapping([("name", text("postgresql")), ("state", text("restarted"))]),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pgforge_spec::{RawGenerationRequest, RequestValidator};

    fn request(version: &str, replicas: i64) -> GenerationRequest {
        let raw = RawGenerationRequest::new()
            .with_postgres_version(version)
            .with_instance_type("t2.micro")
            .with_num_replicas(replicas)
            .with_max_connections(100)
            .with_shared_buffers("256MB");
        RequestValidator::default().validate(&raw).unwrap()
    }

    fn task_names(play: &Play) -> Vec<&str> {
        play.tasks.iter().map(|t| t.name()).collect()
    }

    #[test]
    fn test_one_play_per_node() {
        let renderer = PlaybookRenderer::default();
        for replicas in [0, 1, 4] {
            let plays = renderer.plays(&request("14.10", replicas)).unwrap();
            assert_eq!(plays.len() as i64, replicas + 1);
            assert_eq!(plays[0].hosts, PRIMARY_GROUP);
            for (i, play) in plays.iter().skip(1).enumerate() {
                assert_eq!(play.hosts, format!("postgres_replica_{}", i + 1));
            }
        }
    }

    #[test]
    fn test_replica_plays_are_identical_apart_from_hosts() {
        let plays = PlaybookRenderer::default().plays(&request("14.10", 3)).unwrap();
        let first = &plays[1];
        for play in &plays[2..] {
            assert_eq!(play.tasks, first.tasks);
            assert_eq!(play.vars, first.vars);
            assert_ne!(play.hosts, first.hosts);
        }
    }

    #[test]
    fn test_streaming_replicas_clone_the_primary() {
        let plays = PlaybookRenderer::default().plays(&request("14.10", 1)).unwrap();
        let names = task_names(&plays[1]);
        assert!(names.contains(&"Clone the primary with pg_basebackup"));
        assert_eq!(names.last(), Some(&"Start and enable PostgreSQL"));
        assert!(task_names(&plays[0]).contains(&"Create replication role"));
    }

    #[test]
    fn test_standalone_replicas_skip_replication() {
        let settings = PlaybookSettings::default().with_replication(ReplicationMode::Standalone);
        let renderer = PlaybookRenderer::new(settings).unwrap();
        let plays = renderer.plays(&request("14.10", 2)).unwrap();

        for play in &plays {
            let names = task_names(play);
            assert!(!names.contains(&"Clone the primary with pg_basebackup"));
            assert!(!names.contains(&"Create replication role"));
        }
        assert_eq!(plays[1].tasks, plays[0].tasks);
    }

    #[test]
    fn test_recovery_marker_depends_on_version() {
        let renderer = PlaybookRenderer::default();
        let modern = renderer.render(&request("14.10", 1)).unwrap();
        assert!(modern.contains("/var/lib/postgresql/14/main/standby.signal"));

        let legacy = renderer.render(&request("9.6", 1)).unwrap();
        assert!(legacy.contains("/var/lib/postgresql/9.6/main/recovery.conf"));
        assert!(legacy.contains("postgresql-9.6"));
    }

    #[test]
    fn test_kilobyte_buffers_use_postgres_unit() {
        let raw = RawGenerationRequest::new()
            .with_postgres_version("15.4")
            .with_instance_type("t3.micro")
            .with_num_replicas(0)
            .with_max_connections(50)
            .with_shared_buffers("131072KB");
        let request = RequestValidator::default().validate(&raw).unwrap();
        let yaml = PlaybookRenderer::default().render(&request).unwrap();
        assert!(yaml.contains("131072kB"));
    }

    #[test]
    fn test_render_is_deterministic() {
        let renderer = PlaybookRenderer::default();
        assert_eq!(
            renderer.render(&request("14.10", 2)).unwrap(),
            renderer.render(&request("14.10", 2)).unwrap()
        );
    }
}
