//! Test fixtures: shell stand-ins for the real collaborators

use std::path::{Path, PathBuf};
use std::time::Duration;
use tester::{CommandSpec, ExpectedTree};

pub struct TestFixtures;

impl TestFixtures {
    pub const GRACE: Duration = Duration::from_secs(5);
    pub const SHORT_GRACE: Duration = Duration::from_millis(300);
    pub const READINESS_TIMEOUT: Duration = Duration::from_secs(5);
    pub const MOUNT_TIMEOUT: Duration = Duration::from_secs(5);

    /// Stand-in server: stays up until signalled, never listens itself
    pub fn server() -> CommandSpec {
        CommandSpec::new("sleep").arg("30")
    }

    /// Stand-in mount client: publishes a tiny tree and the liveness marker
    pub fn mounting_client() -> CommandSpec {
        CommandSpec::shell(
            "mkdir -p {mount_point}/.json \
             && printf '[]' > {mount_point}/.json/secrets \
             && printf 'asddas' > {mount_point}/General_Password \
             && touch {mount_point}/.running \
             && exec sleep 30",
        )
    }

    /// Client that dies before mounting
    pub fn crashing_client() -> CommandSpec {
        CommandSpec::new("false")
    }

    /// Leader that forks a helper and records its pid
    pub fn helper_spawning(pid_file: &Path) -> CommandSpec {
        CommandSpec::shell(format!("sleep 30 & echo $! > {}; wait", pid_file.display()))
    }

    /// Group that ignores SIGTERM (the disposition survives exec)
    pub fn unresponsive() -> CommandSpec {
        CommandSpec::shell("trap '' TERM; sleep 30")
    }

    /// Expected tree matching [`Self::mounting_client`]
    pub fn expected_tree() -> ExpectedTree {
        let mut tree = ExpectedTree {
            markers: vec![PathBuf::from(".running")],
            json_listings: vec![PathBuf::from(".json/secrets")],
            absent: vec![PathBuf::from("a_secret_which_does_not_exist")],
            excluded: vec!["Hacking_Password".to_string()],
            ..ExpectedTree::default()
        };
        tree.entries.push(
            tester::testing::ExpectedEntry::new("General_Password")
                .listed()
                .content("asddas"),
        );
        tree
    }
}
