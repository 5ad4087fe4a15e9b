//! JSON-lines replay over a configured chain

use std::collections::HashMap;

use prefilter::config::Config;
use prefilter::filter::FilterChain;
use prefilter::replay;
use prefilter::target::StaticTarget;

#[tokio::test]
async fn test_replay_with_configured_chain() {
    let vars: HashMap<&str, &str> = [
        ("RATE_LIMIT", "1"),
        ("TARGET_STATUS", "202"),
        ("TARGET_BODY", "accepted"),
        ("TARGET_PREFIX", "/jobs"),
    ]
    .into_iter()
    .collect();
    let config = Config::from_vars(&vars).unwrap();
    let chain = FilterChain::from_config(&config.chain);
    let target = StaticTarget::from_config(&config.target);

    let input = concat!(
        r#"{"method":"POST","uri":"/jobs","client_ip":"10.0.0.1"}"#,
        "\n",
        r#"{"method":"POST","uri":"/jobs","client_ip":"10.0.0.1"}"#,
        "\n",
        r#"{"uri":"/elsewhere","client_ip":"10.0.0.2"}"#,
        "\n",
        "{broken\n",
    );
    let mut out = Vec::new();

    let stats = replay::run(&chain, &target, input.as_bytes(), &mut out)
        .await
        .unwrap();
    assert_eq!(stats.lines, 4);
    assert_eq!(stats.ok, 3);
    assert_eq!(stats.failed, 1);

    let lines: Vec<serde_json::Value> = String::from_utf8(out)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();

    assert_eq!(lines[0]["status"], 202);
    assert_eq!(lines[0]["body"], "accepted");
    assert_eq!(lines[0]["headers"]["x-ratelimit-limit"], "1");

    assert_eq!(lines[1]["status"], 429);
    assert_eq!(lines[1]["aborted_by"], "RateLimitFilter");

    // Unmatched: no request filters, so no rate limit headers
    assert_eq!(lines[2]["status"], 404);
    assert!(lines[2]["headers"].get("x-ratelimit-limit").is_none());

    assert_eq!(lines[3]["line"], 4);
    assert!(lines[3]["error"].is_string());
}
