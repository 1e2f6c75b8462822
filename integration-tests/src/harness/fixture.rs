use flowtag_core::config::PipelineConfig;
use flowtag_core::pipeline::{self, RunOptions, RunOutcome};
use flowtag_core::FlowTagError;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

pub const LOOKUP_TABLE: &str = "dstport,protocol,tag\n\
    25,tcp,sv_P1\n\
    68,udp,sv_P2\n\
    23,tcp,sv_P1\n\
    31,udp,sv_P3\n\
    443,tcp,sv_P2\n\
    22,tcp,sv_P4\n\
    3389,tcp,sv_P5\n\
    0,icmp,sv_P5\n\
    110,tcp,email\n\
    993,tcp,email\n\
    143,tcp,email\n";

pub const PROTOCOL_MAP: &str = "6,tcp\n17,udp\n1,icmp\n";

pub const FLOW_LOG: &str = "src1 dst1 1000 srcport1 dstport1 192.168.1.1 25 6\n\
    src2 dst2 1000 srcport2 dstport2 192.168.1.2 68 17\n\
    src3 dst3 1000 srcport3 dstport3 192.168.1.3 23 6\n\
    src4 dst4 1000 srcport4 dstport4 192.168.1.4 31 17\n\
    src5 dst5 1000 srcport5 dstport5 192.168.1.5 443 6\n\
    src6 dst6 1000 srcport6 dstport6 192.168.1.6 22 6\n\
    src7 dst7 1000 srcport7 dstport7 192.168.1.7 3389 6\n\
    src8 dst8 1000 srcport8 dstport8 192.168.1.8 0 1\n\
    src9 dst9 1000 srcport9 dstport9 192.168.1.9 110 6\n\
    src10 dst10 1000 srcport10 dstport10 192.168.1.10 993 6\n\
    src11 dst11 1000 srcport11 dstport11 192.168.1.11 143 6\n\
    src11 dst11 1000 srcport11 dstport11 192.168.1.11 223 6\n";

/// Input and output files for one run, in a private temp directory.
///
/// Starts out with the standard lookup table, protocol map and flow log;
/// each can be replaced before running.
pub struct Fixture {
    dir: TempDir,
    use_protocol_map: bool,
    config: PipelineConfig,
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create fixture dir");
        let fixture = Self {
            dir,
            use_protocol_map: true,
            config: PipelineConfig::default(),
        };

        fixture.with_lookup_table(LOOKUP_TABLE);
        fixture.with_protocol_map(PROTOCOL_MAP);
        fixture.with_flow_log(FLOW_LOG);
        fixture
    }

    pub fn lookup_table_path(&self) -> PathBuf {
        self.dir.path().join("lookup_table.csv")
    }

    pub fn protocol_map_path(&self) -> PathBuf {
        self.dir.path().join("protocol_map.csv")
    }

    pub fn flow_log_path(&self) -> PathBuf {
        self.dir.path().join("flow_log.log")
    }

    pub fn output_path(&self) -> PathBuf {
        self.dir.path().join("output.txt")
    }

    pub fn with_lookup_table(&self, contents: &str) -> &Self {
        fs::write(self.lookup_table_path(), contents).expect("failed to write lookup table");
        self
    }

    pub fn with_protocol_map(&self, contents: &str) -> &Self {
        fs::write(self.protocol_map_path(), contents).expect("failed to write protocol map");
        self
    }

    pub fn with_flow_log(&self, contents: impl AsRef<[u8]>) -> &Self {
        fs::write(self.flow_log_path(), contents).expect("failed to write flow log");
        self
    }

    /// Run with the built-in protocol table instead of the fixture's file.
    pub fn builtin_protocols(mut self) -> Self {
        self.use_protocol_map = false;
        self
    }

    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn options(&self) -> RunOptions {
        RunOptions {
            flow_log: self.flow_log_path(),
            lookup_table: self.lookup_table_path(),
            output: self.output_path(),
            protocol_map: self.use_protocol_map.then(|| self.protocol_map_path()),
            config: self.config,
        }
    }

    pub fn run(&self) -> Result<RunOutcome, FlowTagError> {
        pipeline::run(&self.options())
    }

    pub fn report(&self) -> String {
        fs::read_to_string(self.output_path()).expect("failed to read report")
    }
}
