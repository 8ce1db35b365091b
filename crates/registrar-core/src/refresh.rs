use std::sync::Arc;

use futures::future::join_all;
use tracing::{error, info, info_span, Instrument};

use crate::config::RefreshConfig;
use crate::consensus::collect_light_root;
use crate::crawler::refresh_peers;
use crate::directory::PeerDirectory;
use crate::error::CoreError;
use crate::height::resolve_height;
use crate::history::HistoryStore;
use crate::registry::RegistryLayout;
use crate::rpc::NodeRpc;
use crate::types::LightRoot;

/// Outcome of one successful refresh cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainReport {
    pub chain_id: String,
    /// Peers on file before the crawl.
    pub known: usize,
    /// Peers that answered the crawl and were saved.
    pub reachable: usize,
    pub height: u64,
    pub root: LightRoot,
}

/// Runs refresh cycles against one registry checkout.
pub struct Registrar {
    rpc: Arc<dyn NodeRpc>,
    config: RefreshConfig,
    peers: PeerDirectory,
    history: HistoryStore,
}

impl Registrar {
    pub fn new(
        rpc: Arc<dyn NodeRpc>,
        layout: RegistryLayout,
        config: RefreshConfig,
    ) -> Result<Self, CoreError> {
        config.validate()?;
        Ok(Self {
            rpc,
            config,
            peers: PeerDirectory::new(layout.clone()),
            history: HistoryStore::new(layout),
        })
    }

    /// One full cycle for `chain_id`: crawl, resolve a settled height, agree
    /// on its light root, record the root and save the refreshed peers.
    ///
    /// Any failure returns before the peer file is written.
    pub async fn refresh_chain(&self, chain_id: &str) -> Result<ChainReport, CoreError> {
        let known = self.peers.load(chain_id)?;
        info!(chain_id, known = known.len(), "refreshing chain");

        let reachable = refresh_peers(self.rpc.clone(), &known, &self.config).await;
        let height = resolve_height(self.rpc.as_ref(), &reachable, chain_id, &self.config).await?;
        let root = collect_light_root(self.rpc.clone(), &reachable, height, &self.config).await?;

        self.history.append(chain_id, root.clone())?;
        self.peers.save(chain_id, &reachable)?;

        Ok(ChainReport {
            chain_id: chain_id.to_owned(),
            known: known.len(),
            reachable: reachable.len(),
            height,
            root,
        })
    }

    /// Refresh every chain in `chain_ids` concurrently.
    ///
    /// Results come back in input order, one per chain; a failed chain is
    /// logged and reported without affecting the others.
    pub async fn refresh_chains(
        &self,
        chain_ids: &[String],
    ) -> Vec<(String, Result<ChainReport, CoreError>)> {
        let cycles = chain_ids.iter().map(|chain_id| {
            let span = info_span!("refresh", chain_id = %chain_id);
            async move {
                let result = self.refresh_chain(chain_id).await;
                if let Err(e) = &result {
                    error!(error = %e, "refresh failed");
                }
                (chain_id.clone(), result)
            }
            .instrument(span)
        });
        join_all(cycles).await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::registry::test_dir::TestDir;
    use crate::rpc::mock::{MockNode, MockRpc};
    use crate::types::{Peer, PeerSet};

    const HASH: &str = "E37F5936731F7F0FF35497255C666B91E719896A2E1E2F55A778A970AF92157E";
    const OTHER_HASH: &str = "C21AFE7C2AB4927497DD239568FB9F819120D70EAF254E970185F88502806F1E";

    fn config() -> RefreshConfig {
        RefreshConfig {
            crawl_timeout: Duration::from_millis(200),
            probe_timeout: Duration::from_millis(100),
            height_timeout: Duration::from_millis(150),
            catch_up_backoff: Duration::from_millis(20),
            commit_timeout: Duration::from_millis(100),
            ..RefreshConfig::default()
        }
    }

    fn seed(directory: &PeerDirectory, chain_id: &str, id: &str, ip: &str) {
        let mut peer = Peer::discovered(id, format!("http://{ip}:26657"));
        peer.is_seed = true;
        let peers = PeerSet::from([(id.to_owned(), peer)]);
        directory.save(chain_id, &peers).expect("fixture peers");
    }

    fn registrar(dir: &TestDir, rpc: MockRpc) -> Registrar {
        Registrar::new(Arc::new(rpc), RegistryLayout::new(&dir.0), config())
            .expect("valid config")
    }

    #[tokio::test]
    async fn successful_cycle_records_root_and_saves_peers() {
        let dir = TestDir::new("refresh-ok");
        let layout = RegistryLayout::new(&dir.0);
        let directory = PeerDirectory::new(layout.clone());
        seed(&directory, "test-1", "a", "10.0.0.1");

        let rpc = MockRpc::builder()
            .with_node(
                "http://10.0.0.1:26657",
                MockNode::new("a", "test-1", 500).with_peer("b", "10.0.0.2"),
            )
            .with_node("http://10.0.0.2:26657", MockNode::new("b", "test-1", 501))
            .build();
        let report = registrar(&dir, rpc)
            .refresh_chain("test-1")
            .await
            .expect("cycle must succeed");

        assert_eq!(report.known, 1);
        assert_eq!(report.reachable, 2);
        assert_eq!(report.height, 500);
        assert_eq!(report.root, LightRoot::new(500, HASH));

        let history = HistoryStore::new(layout).load("test-1").expect("history");
        assert_eq!(history.latest(), Some(&report.root));
        let saved = directory.load("test-1").expect("peers");
        assert!(saved["a"].is_seed && saved["a"].reachable);
        assert!(saved["b"].reachable);
    }

    #[tokio::test]
    async fn divergence_leaves_registry_untouched() {
        let dir = TestDir::new("refresh-diverge");
        let layout = RegistryLayout::new(&dir.0);
        let directory = PeerDirectory::new(layout.clone());
        seed(&directory, "test-1", "a", "10.0.0.1");
        let before = std::fs::read(layout.chain("test-1").expect("id").peers).expect("fixture");

        let rpc = MockRpc::builder()
            .with_node(
                "http://10.0.0.1:26657",
                MockNode::new("a", "test-1", 500).with_peer("b", "10.0.0.2"),
            )
            .with_node(
                "http://10.0.0.2:26657",
                MockNode::new("b", "test-1", 500).with_block_hash(OTHER_HASH),
            )
            .build();
        let err = registrar(&dir, rpc)
            .refresh_chain("test-1")
            .await
            .expect_err("split round must fail");
        assert!(matches!(err, CoreError::Divergence { .. }));

        let after = std::fs::read(layout.chain("test-1").expect("id").peers).expect("still there");
        assert_eq!(before, after, "peer file must not be rewritten");
        assert!(HistoryStore::new(layout).load("test-1").expect("history").is_empty());
    }

    #[tokio::test]
    async fn chain_without_peers_is_exhausted() {
        let dir = TestDir::new("refresh-empty");
        let err = registrar(&dir, MockRpc::builder().build())
            .refresh_chain("test-1")
            .await
            .expect_err("nothing to ask");
        assert!(matches!(err, CoreError::NoUsableHeight { tried: 0, .. }));
        assert!(!dir.0.join("test-1").exists());
    }

    #[tokio::test]
    async fn one_failing_chain_does_not_affect_others() {
        let dir = TestDir::new("refresh-many");
        let directory = PeerDirectory::new(RegistryLayout::new(&dir.0));
        seed(&directory, "good-1", "a", "10.0.0.1");
        seed(&directory, "bad-1", "x", "10.0.0.9");
        seed(&directory, "good-2", "b", "10.0.0.2");

        let rpc = MockRpc::builder()
            .with_node("http://10.0.0.1:26657", MockNode::new("a", "good-1", 100))
            .with_node("http://10.0.0.2:26657", MockNode::new("b", "good-2", 200))
            .build();
        let chains = ["good-1", "bad-1", "good-2"].map(String::from);
        let results = registrar(&dir, rpc).refresh_chains(&chains).await;

        let order: Vec<&str> = results.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(order, ["good-1", "bad-1", "good-2"]);
        assert_eq!(results[0].1.as_ref().expect("good-1").height, 100);
        assert!(results[1].1.is_err());
        assert_eq!(results[2].1.as_ref().expect("good-2").height, 200);
    }

    #[tokio::test]
    async fn persistence_failures_stay_within_their_chain() {
        let dir = TestDir::new("refresh-persist");
        let layout = RegistryLayout::new(&dir.0);
        let directory = PeerDirectory::new(layout.clone());
        seed(&directory, "good-1", "a", "10.0.0.1");
        seed(&directory, "unwritable-1", "c", "10.0.0.3");

        // A directory where the history file belongs cannot be read or replaced.
        let blocked = layout.chain("unwritable-1").expect("valid id");
        std::fs::create_dir_all(&blocked.heights).expect("fixture dir");
        let blocked_peers = std::fs::read(&blocked.peers).expect("fixture peers");

        let garbled = layout.chain("garbled-1").expect("valid id");
        std::fs::create_dir_all(&garbled.dir).expect("fixture dir");
        std::fs::write(&garbled.peers, b"{ not json").expect("fixture peers");

        let rpc = MockRpc::builder()
            .with_node("http://10.0.0.1:26657", MockNode::new("a", "good-1", 100))
            .with_node("http://10.0.0.3:26657", MockNode::new("c", "unwritable-1", 300))
            .build();
        let chains = ["unwritable-1", "good-1", "garbled-1"].map(String::from);
        let results = registrar(&dir, rpc).refresh_chains(&chains).await;

        assert!(matches!(results[0].1, Err(CoreError::Persist { .. })));
        assert!(matches!(results[2].1, Err(CoreError::Decode { .. })));

        let report = results[1].1.as_ref().expect("good-1 is unaffected");
        assert_eq!(report.root, LightRoot::new(100, HASH));
        let history = HistoryStore::new(layout).load("good-1").expect("history");
        assert_eq!(history.latest(), Some(&report.root));
        assert!(directory.load("good-1").expect("peers")["a"].reachable);

        assert_eq!(
            std::fs::read(&blocked.peers).expect("still there"),
            blocked_peers,
            "failed chain keeps its peer file"
        );
        assert_eq!(
            std::fs::read(&garbled.peers).expect("still there"),
            b"{ not json"
        );
    }

    #[test]
    fn invalid_config_is_rejected() {
        let dir = TestDir::new("refresh-config");
        let config = RefreshConfig {
            max_in_flight: 0,
            ..config()
        };
        let result = Registrar::new(
            Arc::new(MockRpc::builder().build()),
            RegistryLayout::new(&dir.0),
            config,
        );
        assert!(matches!(result, Err(CoreError::InvalidConfig(_))));
    }
}
