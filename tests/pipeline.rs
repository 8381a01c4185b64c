//! End-to-end pipeline tests with a scripted client: CSV in, enrichment,
//! CSV out, plus the estimate/run agreement and session-ledger behavior.

mod common;

use std::time::Duration;

use common::{url_sheet, MockClient, Reply};
use org_enrich::client::GenerationClient;
use org_enrich::dataset::col;
use org_enrich::enrich::{
    run_dossier_enrichment, run_estimate, run_url_enrichment, CancelToken, DossierOptions,
    EstimateOptions, EstimateTarget, RetryPolicy, UrlEnrichmentOptions,
};
use org_enrich::sheet_io::{read_csv, write_csv};
use org_enrich::stats::{OperationStatus, SessionLedger};

fn fast_url_options() -> UrlEnrichmentOptions {
    UrlEnrichmentOptions {
        retry: RetryPolicy::new(3, Duration::ZERO, Duration::ZERO),
        ..UrlEnrichmentOptions::default()
    }
}

#[test]
fn csv_to_enriched_csv() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let input = dir.path().join("orgs.csv");
    let output = dir.path().join("orgs.clean.csv");

    write_csv(&url_sheet(&[("A", ""), ("B", "good.com")]), &input).expect("seed input");

    let mut dataset = read_csv(&input).expect("read input");
    let client = MockClient::new(vec![Reply::Ok(
        r#"[["Name","URL"],["A","a.com"]]"#.to_string(),
    )]);
    let outcome = run_url_enrichment(
        &mut dataset,
        &client,
        &fast_url_options(),
        &CancelToken::new(),
    );
    write_csv(&dataset, &output).expect("write output");

    assert_eq!(outcome.stats.status, OperationStatus::Completed);
    assert_eq!(outcome.stats.api_requests, 1);
    assert!(outcome.skipped_batches.is_empty());

    let reloaded = read_csv(&output).expect("re-read output");
    assert_eq!(reloaded.cell(1, col::NAME), "A");
    assert_eq!(reloaded.cell(1, col::WEBSITE), "a.com");
    assert_eq!(reloaded.cell(2, col::WEBSITE), "good.com");
}

#[test]
fn permanent_outage_preserves_the_sheet() {
    let mut dataset = url_sheet(&[("A", ""), ("B", "good.com")]);
    let client = MockClient::new(vec![]);

    let outcome = run_url_enrichment(
        &mut dataset,
        &client,
        &fast_url_options(),
        &CancelToken::new(),
    );

    assert_eq!(outcome.stats.status, OperationStatus::Error);
    assert_eq!(outcome.skipped_batches, vec![1]);
    assert_eq!(dataset.cell(1, col::WEBSITE), "");
    assert_eq!(dataset.cell(2, col::WEBSITE), "good.com");
    // 1 + MAX_RETRIES submissions, one counted request.
    assert_eq!(client.generate_calls(), 4);
    assert_eq!(outcome.stats.api_requests, 1);
}

#[test]
fn estimate_agrees_with_the_live_run_on_calls_and_input_tokens() {
    let rows = &[
        ("A", ""),
        ("B", "good.com"),
        ("C", "gmail.com"),
        ("D", "d.org"),
        ("E", ""),
    ];
    let options = UrlEnrichmentOptions {
        batch_size: 2,
        ..fast_url_options()
    };

    let estimate = run_estimate(
        &url_sheet(rows),
        &MockClient::new(vec![]),
        &EstimateOptions {
            target: EstimateTarget::Urls,
            batch_size: options.batch_size,
            model: options.model.clone(),
        },
    );
    assert_eq!(estimate.status, OperationStatus::Completed);

    // Every batch holds at least one implausible URL (A empty, C a generic
    // provider domain, E empty), so all three trigger a call.
    let mut dataset = url_sheet(rows);
    let client = MockClient::new(vec![
        Reply::Ok(r#"[["Name","URL"],["A","a.com"]]"#.to_string()),
        Reply::Ok(r#"[["Name","URL"],["C","c.com"]]"#.to_string()),
        Reply::Ok(r#"[["Name","URL"],["E","e.com"]]"#.to_string()),
    ]);
    let outcome = run_url_enrichment(&mut dataset, &client, &options, &CancelToken::new());

    assert_eq!(outcome.stats.status, OperationStatus::Completed);
    assert_eq!(estimate.api_requests, outcome.stats.api_requests);
    assert_eq!(estimate.input_tokens, outcome.stats.input_tokens);
}

#[test]
fn session_ledger_accumulates_url_and_dossier_runs() {
    let mut ledger = SessionLedger::default();

    let mut dataset = org_enrich::dataset::Dataset::from_rows(vec![
        vec![
            "Name".to_string(),
            "URL".to_string(),
            "Description".to_string(),
            "Dossier".to_string(),
        ],
        vec!["Acme".to_string(), String::new(), String::new(), String::new()],
    ]);

    let url_client = MockClient::new(vec![Reply::Ok(
        r#"[["Name","URL","Description","Dossier"],["Acme","acme.com","",""]]"#.to_string(),
    )]);
    let url_outcome = run_url_enrichment(
        &mut dataset,
        &url_client,
        &fast_url_options(),
        &CancelToken::new(),
    );
    ledger.absorb(&url_outcome.stats);

    let dossier_client = MockClient::new(vec![Reply::Ok("Acme makes anvils.".to_string())]);
    let dossier_outcome = run_dossier_enrichment(
        &mut dataset,
        &dossier_client,
        &DossierOptions {
            retry: RetryPolicy::new(1, Duration::ZERO, Duration::ZERO),
            ..DossierOptions::default()
        },
        &CancelToken::new(),
    );
    ledger.absorb(&dossier_outcome.stats);

    assert_eq!(dataset.cell(1, col::WEBSITE), "acme.com");
    assert_eq!(dataset.cell(1, col::DOSSIER), "Acme makes anvils.");
    assert_eq!(ledger.api_requests, 2);
    assert_eq!(
        ledger.input_tokens,
        url_outcome.stats.input_tokens + dossier_outcome.stats.input_tokens
    );
    let expected_cost = url_outcome.stats.estimated_cost + dossier_outcome.stats.estimated_cost;
    assert!((ledger.estimated_cost - expected_cost).abs() < 1e-12);

    ledger.reset();
    assert_eq!(ledger.api_requests, 0);
}

#[test]
fn mid_run_cancellation_keeps_committed_batches() {
    let rows = &[("A", ""), ("B", "")];
    let mut dataset = url_sheet(rows);
    let client = MockClient::new(vec![Reply::Ok(
        r#"[["Name","URL"],["A","a.com"]]"#.to_string(),
    )]);
    let cancel = CancelToken::new();

    let options = UrlEnrichmentOptions {
        batch_size: 1,
        ..fast_url_options()
    };

    // Cancel once the first batch has been committed: the scripted client
    // has exactly one reply, so cancel before the second batch submits.
    let outcome = {
        struct CancelAfterFirst<'a> {
            inner: &'a MockClient,
            cancel: &'a CancelToken,
        }
        impl org_enrich::client::GenerationClient for CancelAfterFirst<'_> {
            fn count_tokens(
                &self,
                model: &str,
                content: &str,
            ) -> Result<u64, org_enrich::client::ClientError> {
                self.inner.count_tokens(model, content)
            }
            fn generate_content(
                &self,
                model: &str,
                content: &str,
                options: &org_enrich::client::GenerationOptions,
            ) -> Result<org_enrich::client::GenerationReply, org_enrich::client::ClientError>
            {
                let reply = self.inner.generate_content(model, content, options);
                self.cancel.cancel();
                reply
            }
        }
        let wrapper = CancelAfterFirst {
            inner: &client,
            cancel: &cancel,
        };
        run_url_enrichment(&mut dataset, &wrapper, &options, &cancel)
    };

    assert_eq!(outcome.stats.status, OperationStatus::Error);
    assert_eq!(outcome.stats.progress, "cancelled after 1/2 batches");
    assert_eq!(dataset.cell(1, col::WEBSITE), "a.com");
    assert_eq!(dataset.cell(2, col::WEBSITE), "");
    assert_eq!(client.generate_calls(), 1);
}
