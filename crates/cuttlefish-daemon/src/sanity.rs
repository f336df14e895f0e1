//! End-to-end sanity check against a running server.
//!
//! Hits `/health`, then runs the default, comprehensive and incident
//! scenarios through `/multiagent-rag` and reports what came back.

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use cuttlefish_rag::RagResponse;
use cuttlefish_service::HealthResponse;
use cuttlefish_types::Decision;

/// One routed request and the decision it must produce.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub name: &'static str,
    pub query: &'static str,
    pub user_can_wait: bool,
    pub production_incident: bool,
    pub expected: Decision,
}

pub fn scenarios() -> Vec<Scenario> {
    vec![
        Scenario {
            name: "default",
            query: "How to fix memory leaks in XML parser",
            user_can_wait: false,
            production_incident: false,
            expected: Decision::Fast,
        },
        Scenario {
            name: "comprehensive",
            query: "How to fix memory leaks in XML parser",
            user_can_wait: true,
            production_incident: false,
            expected: Decision::Comprehensive,
        },
        Scenario {
            name: "incident",
            query: "Production system down with ClassCastException",
            user_can_wait: false,
            production_incident: true,
            expected: Decision::Incident,
        },
    ]
}

/// Check a response against the scenario's expectations.
pub fn check_response(scenario: &Scenario, response: &RagResponse) -> Result<(), String> {
    let meta = &response.metadata;
    if meta.routing_decision != scenario.expected {
        return Err(format!(
            "expected {} but got {}",
            scenario.expected, meta.routing_decision
        ));
    }
    if meta.retrieval_method != scenario.expected.method() && !meta.retrieval_method.is_degraded()
    {
        return Err(format!("unexpected method {}", meta.retrieval_method));
    }
    if meta.num_tickets_found != response.context.len() {
        return Err(format!(
            "num_tickets_found {} != context length {}",
            meta.num_tickets_found,
            response.context.len()
        ));
    }
    Ok(())
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorInfo,
}

#[derive(Deserialize)]
struct ErrorInfo {
    kind: String,
    message: String,
}

fn stamp() -> String {
    Local::now().format("%H:%M:%S").to_string()
}

/// Run the sanity check. Fails when any scenario fails.
pub async fn run_sanity(endpoint: &str, openai_key: Option<String>) -> Result<()> {
    let endpoint = endpoint.trim_end_matches('/');
    let openai_key = openai_key.or_else(|| std::env::var("OPENAI_API_KEY").ok());
    let client = Client::builder()
        .timeout(Duration::from_secs(180))
        .build()
        .context("Failed to create HTTP client")?;

    println!("[{}] Checking {}/health", stamp(), endpoint);
    let health: HealthResponse = client
        .get(format!("{endpoint}/health"))
        .send()
        .await
        .context("Server unreachable")?
        .json()
        .await
        .context("Invalid health response")?;
    println!(
        "[{}] {} {} is {:?}",
        stamp(),
        health.service,
        health.version,
        health.status
    );
    for (agent, status) in &health.agents {
        println!("    {agent}: {status:?}");
    }

    let all = scenarios();
    let mut failures = 0;
    for scenario in &all {
        let body = json!({
            "query": scenario.query,
            "user_can_wait": scenario.user_can_wait,
            "production_incident": scenario.production_incident,
            "openai_api_key": openai_key,
        });

        let outcome = async {
            let response = client
                .post(format!("{endpoint}/multiagent-rag"))
                .json(&body)
                .send()
                .await
                .map_err(|e| e.to_string())?;
            if !response.status().is_success() {
                let status = response.status();
                return Err(match response.json::<ErrorEnvelope>().await {
                    Ok(err) => format!("HTTP {status}: {} ({})", err.error.message, err.error.kind),
                    Err(_) => format!("HTTP {status}"),
                });
            }
            let rag: RagResponse = response.json().await.map_err(|e| e.to_string())?;
            check_response(scenario, &rag)?;
            Ok(rag)
        }
        .await;

        match outcome {
            Ok(rag) => println!(
                "[{}] PASS {}: decision={} method={} time={:.2}s tickets={}",
                stamp(),
                scenario.name,
                rag.metadata.routing_decision,
                rag.metadata.retrieval_method,
                rag.metadata.processing_time,
                rag.metadata.num_tickets_found
            ),
            Err(reason) => {
                failures += 1;
                println!("[{}] FAIL {}: {}", stamp(), scenario.name, reason);
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} of {} sanity scenarios failed", failures, all.len());
    }
    println!("[{}] All {} scenarios passed", stamp(), all.len());
    Ok(())
}
