//! Sykli CI pipeline for vigil
//!
//! Run locally: sykli run
//! Or: cargo run --bin sykli --features sykli -- --emit | sykli run -

use sykli::{Condition, Pipeline, Template};

fn main() {
    let mut p = Pipeline::new();

    // === RESOURCES ===
    let src = p.dir(".");
    let cargo_registry = p.cache("cargo-registry");
    let cargo_git = p.cache("cargo-git");
    let target_cache = p.cache("target");

    // === TEMPLATE ===
    // Common Rust container configuration
    let rust = Template::new()
        .container("rust:1.85")
        .mount_dir(&src, "/src")
        .mount_cache(&cargo_registry, "/usr/local/cargo/registry")
        .mount_cache(&cargo_git, "/usr/local/cargo/git")
        .mount_cache(&target_cache, "/src/target")
        .workdir("/src");

    // === TASKS ===

    // Test - run all tests
    let _ = p
        .task("test")
        .from(&rust)
        .run("cargo test --all-features")
        .inputs(&["**/*.rs", "Cargo.toml", "Cargo.lock"]);

    // Lint - run clippy with strict warnings
    let _ = p
        .task("lint")
        .from(&rust)
        .run("cargo clippy --all-targets --all-features -- -D warnings")
        .inputs(&["**/*.rs", "Cargo.toml", "Cargo.lock"]);

    // Format check - verify code formatting
    let _ = p
        .task("fmt")
        .from(&rust)
        .run("cargo fmt -- --check")
        .inputs(&["**/*.rs"]);

    // Build release binary (depends on test, lint, fmt)
    let _ = p
        .task("build")
        .from(&rust)
        .run("cargo build --release --bin vigil")
        .inputs(&["**/*.rs", "Cargo.toml", "Cargo.lock"])
        .output("binary", "target/release/vigil")
        .after(&["test", "lint", "fmt"]);

    // Smoke test: start the binary and probe liveness and readiness.
    // No database in CI, so readiness must answer 503.
    let _ = p
        .task("smoke-test")
        .from(&rust)
        .run(
            r#"#!/bin/bash
set -e

VIGIL_PORT=5050 VIGIL_DRAIN_SECONDS=1 RUST_LOG=info ./target/release/vigil > /tmp/vigil-log.txt 2>&1 &
VIGIL_PID=$!
sleep 2

LIVE=$(curl -s -o /dev/null -w '%{http_code}' http://127.0.0.1:5050/live)
if [ "$LIVE" != "200" ]; then
  echo "ERROR: /live should return 200, got $LIVE"
  cat /tmp/vigil-log.txt
  exit 1
fi

READY=$(curl -s -o /dev/null -w '%{http_code}' http://127.0.0.1:5050/ready)
if [ "$READY" != "503" ]; then
  echo "ERROR: /ready without a database should return 503, got $READY"
  cat /tmp/vigil-log.txt
  exit 1
fi

kill -TERM $VIGIL_PID
wait $VIGIL_PID || true
grep -q "shut down gracefully" /tmp/vigil-log.txt
echo "Smoke test passed"
"#,
        )
        .input_from("build", "binary", "/src/target/release/vigil")
        .when_cond(Condition::event("push").or(Condition::negate(Condition::branch("*"))))
        .timeout(120);

    p.emit();
}
