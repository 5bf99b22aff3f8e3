use chandere::config::{Config, OutputFormat, OutputMode};
use chandere::site::{Listing, MediaLayout, SiteEndpoints, VichanAdapter};
use chandere::{RunOptions, SiteAdapter, SiteRegistry};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use url::Url;
use wiremock::MockServer;

/// Name the mock imageboard is registered under
pub const MOCK_SITE: &str = "mock";

/// A 4chan-shaped site whose API and media both live on the mock server
pub fn mock_site(server: &MockServer) -> Arc<dyn SiteAdapter> {
    let base = Url::parse(&server.uri()).expect("mock server URI");
    Arc::new(VichanAdapter::new(
        MOCK_SITE,
        SiteEndpoints::single(base),
        "thread",
        Listing::Threads,
        MediaLayout::BoardScoped,
    ))
}

/// Built-in sites plus the mock site
pub fn mock_registry(server: &MockServer) -> SiteRegistry {
    let mut sites = SiteRegistry::builtin();
    sites.insert(mock_site(server));
    sites
}

/// Default configuration with short waits
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.poller.interval = 1;
    config.poller.retry_delay = 0;
    config.poller.request_timeout = 5;
    config.poller.connect_timeout = 5;
    config
}

pub fn run_options(targets: &[&str], mode: OutputMode, output: &Path) -> RunOptions {
    RunOptions {
        targets: targets.iter().map(|t| t.to_string()).collect(),
        site: MOCK_SITE.to_string(),
        mode,
        continuous: false,
        output: output.to_path_buf(),
        format: OutputFormat::Plaintext,
        filters: Vec::new(),
    }
}

/// A board listing naming the given threads on one page
pub fn listing(threads: &[u64]) -> Value {
    let threads: Vec<Value> = threads.iter().map(|no| json!({ "no": no })).collect();
    json!([{ "page": 1, "threads": threads }])
}

/// A reply post of thread 589254
pub fn reply(no: u64, com: &str) -> Value {
    json!({
        "no": no,
        "resto": 589254,
        "time": 1400000000 + no,
        "name": "Anonymous",
        "com": com
    })
}

/// Thread 589254 with an opening post followed by `replies`
pub fn thread(replies: Vec<Value>) -> Value {
    let mut posts = vec![json!({
        "no": 589254,
        "resto": 0,
        "time": 1400000000,
        "name": "Anonymous",
        "sub": "Rust thread",
        "com": "Post your projects<br>Be nice"
    })];
    posts.extend(replies);
    json!({ "posts": posts })
}
