// This is the entry point of the content gate.
//
// **Architecture Overview:**
// - `core/` = Business logic (rule engine, pipeline, audit, submission gate)
// - `infra/` = Implementations of core traits (AI providers, audit stores)
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Run one submission from stdin through the gate

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "infra/infra_layer.rs"]
mod infra;

use crate::core::ai::{AiConfig, AiProvider};
use crate::core::audit::{AuditLog, AuditStore};
use crate::core::moderation::{
    AiClassifier, ModerationConfig, ModerationPipeline, RuleEngine, DEFAULT_CLASSIFIER_TIMEOUT,
};
use crate::core::submission::{GateOutcome, Submission, SubmissionGate};
use crate::infra::ai::{GeminiClient, OpenRouterClient, UnconfiguredProvider};
use crate::infra::audit::{InMemoryAuditStore, SqliteAuditStore};
use anyhow::{Context, Result};
use std::io::{BufRead, Read, Write};
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_AUDIT_DB_PATH: &str = "data/moderation_audit.db";
const DEFAULT_REVIEW_LIMIT: u32 = 20;

/// `AUDIT_DB_PATH=memory` keeps the audit trail in memory for this run only.
async fn build_audit_store(path: &str) -> Result<Box<dyn AuditStore>> {
    if path == "memory" {
        tracing::warn!("Audit records will not be persisted");
        return Ok(Box::new(InMemoryAuditStore::new()));
    }

    let store = SqliteAuditStore::open(path)
        .await
        .with_context(|| format!("Failed to open audit database at {path}"))?;
    Ok(Box::new(store))
}

/// Print the most recent audit records for compliance review.
async fn review(audit: &AuditLog<Box<dyn AuditStore>>, limit: u32) -> Result<()> {
    let records = audit
        .recent(limit)
        .await
        .context("Failed to read audit records")?;

    for record in records {
        println!(
            "{} {:<7}{} via {:<6} user={} ({}) severity={} post={} issues={:?}",
            record.timestamp.to_rfc3339(),
            record.action.as_str(),
            if record.bypassed { " (bypass)" } else { "" },
            record.classifier_used.as_str(),
            record.user_id,
            record.user_name,
            record.verdict.severity,
            record.post_id.as_deref().unwrap_or("-"),
            record.verdict.issues,
        );
    }
    Ok(())
}

/// Pick the classifier backend from the environment.
fn build_provider(timeout: Duration) -> Result<(Box<dyn AiProvider>, AiConfig)> {
    let provider = std::env::var("AI_PROVIDER").unwrap_or_else(|_| "openrouter".to_string());
    let config = |model: String| AiConfig {
        model,
        temperature: 0.0,
        max_tokens: Some(512),
    };

    match provider.as_str() {
        "gemini" => {
            let model =
                std::env::var("GEMINI_MODEL").unwrap_or_else(|_| "gemini-2.5-flash".to_string());
            let provider: Box<dyn AiProvider> = match std::env::var("GEMINI_API_KEY") {
                Ok(key) => Box::new(GeminiClient::new(key, timeout)?),
                Err(_) => {
                    tracing::warn!("GEMINI_API_KEY not set, moderation will use rules only");
                    Box::new(UnconfiguredProvider::new("gemini"))
                }
            };
            Ok((provider, config(model)))
        }
        "openrouter" => {
            let model = std::env::var("OPENROUTER_MODEL")
                .unwrap_or_else(|_| "deepseek/deepseek-chat-v3.1:free".to_string());
            let provider: Box<dyn AiProvider> = match std::env::var("OPENROUTER_API_KEY") {
                Ok(key) => Box::new(OpenRouterClient::new(key, timeout)?),
                Err(_) => {
                    tracing::warn!("OPENROUTER_API_KEY not set, moderation will use rules only");
                    Box::new(UnconfiguredProvider::new("openrouter"))
                }
            };
            Ok((provider, config(model)))
        }
        other => anyhow::bail!("Unknown AI_PROVIDER {other:?} (expected openrouter or gemini)"),
    }
}

fn load_moderation_config() -> Result<ModerationConfig> {
    match std::env::var("MODERATION_CONFIG_FILE") {
        Ok(path) => ModerationConfig::from_json_file(&path)
            .with_context(|| format!("Failed to load moderation config from {path}")),
        Err(_) => ModerationConfig::builtin().context("Built-in moderation config is invalid"),
    }
}

/// First line is the title, the rest is the body.
fn read_submission(user_id: String, user_name: String) -> Result<Submission> {
    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .context("Failed to read submission from stdin")?;

    let (title, body) = match input.split_once('\n') {
        Some((title, body)) => (title.trim().to_string(), body.trim().to_string()),
        None => (String::new(), input.trim().to_string()),
    };

    Ok(Submission {
        title: (!title.is_empty()).then_some(title),
        body,
        user_id,
        user_name,
    })
}

fn confirm(prompt: &str) -> bool {
    print!("{prompt} [y/N] ");
    let _ = std::io::stdout().flush();

    // stdin is already drained by the submission, so ask the terminal directly.
    let answer = std::fs::File::open("/dev/tty")
        .ok()
        .and_then(|tty| std::io::BufReader::new(tty).lines().next())
        .and_then(|line| line.ok())
        .unwrap_or_default();
    matches!(answer.trim(), "y" | "Y" | "yes")
}

fn print_verdict_details(issues: &[String], suggestions: &[String]) {
    for issue in issues {
        println!("  - {issue}");
    }
    for suggestion in suggestions {
        println!("  > {suggestion}");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging so we can see what's happening
    tracing_subscriber::fmt::init();

    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    let mut args = std::env::args().skip(1);
    let first = args.next().context(
        "Usage: content_gate <user_id> [user_name] < post.txt\n       content_gate --recent [limit]",
    )?;

    let classifier_timeout = std::env::var("CLASSIFIER_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_CLASSIFIER_TIMEOUT);
    let audit_db_path =
        std::env::var("AUDIT_DB_PATH").unwrap_or_else(|_| DEFAULT_AUDIT_DB_PATH.to_string());

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================

    let rules = RuleEngine::new(Arc::new(load_moderation_config()?));

    let (provider, ai_config) = build_provider(classifier_timeout)?;
    tracing::info!(
        provider = provider.name(),
        model = %ai_config.model,
        "Classifier configured"
    );
    let classifier = AiClassifier::new(provider, ai_config);

    let pipeline =
        Arc::new(ModerationPipeline::new(rules, classifier).with_timeout(classifier_timeout));

    let audit = Arc::new(AuditLog::new(build_audit_store(&audit_db_path).await?));

    if first == "--recent" {
        let limit = args
            .next()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(DEFAULT_REVIEW_LIMIT);
        return review(&audit, limit).await;
    }

    let mut gate = SubmissionGate::new(pipeline, audit);

    // ========================================================================
    // SUBMISSION
    // ========================================================================

    let user_name = args.next().unwrap_or_else(|| first.clone());
    let submission = read_submission(first, user_name)?;

    let mut outcome = gate.submit(submission.clone()).await;
    if let GateOutcome::Warned(verdict) = &outcome {
        println!("⚠️  Your post may break the community guidelines:");
        print_verdict_details(&verdict.issues, &verdict.suggestions);
        if !confirm("Publish anyway?") {
            println!("Not published.");
            return Ok(());
        }
        outcome = gate.submit(submission).await;
    }

    match outcome {
        GateOutcome::Blocked(verdict) => {
            println!("⛔ Post blocked ({} severity):", verdict.severity);
            print_verdict_details(&verdict.issues, &verdict.suggestions);
        }
        GateOutcome::Warned(_) => {
            // A second submit after a warning always consumes the bypass token.
            tracing::warn!("Submission warned twice in a row");
        }
        GateOutcome::Clean(pass) => {
            // Post storage lives outside this tool; use a local id for audit linkage.
            let post_id = format!("local-{}", chrono::Utc::now().timestamp_millis());
            gate.publish(pass, Some(post_id.clone())).await;
            println!("✅ Published as {post_id}");
        }
    }

    Ok(())
}
