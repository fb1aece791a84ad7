//! Update cycle tests: real extractor and filesystem in a temp directory,
//! scripted release source, minisign signatures produced on the fly.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use autodeploy::application::services::{CycleError, CycleOutcome, Retirement, Verification};
use autodeploy::domain::{AssetError, DeployError, ExtractError, SignatureError, error_chain};

use crate::helpers::{
    ScriptedSource, TestSigner, agent, asset, enforcing_agent, listing, raw_archive,
    release_archive, target,
};

fn read_active(deploy: &std::path::Path, name: &str, file: &str) -> String {
    std::fs::read_to_string(deploy.join(name).join(file)).expect("read through pointer")
}

// ── Sequential updates ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_sequential_releases_promote_and_retire() {
    let deploy = tempfile::tempdir().expect("tempdir");
    let signer = TestSigner::new(7);
    let source = ScriptedSource::default();
    let agent = enforcing_agent(&source, &signer, deploy.path());
    let web = target("web", "widget");

    let v42 = release_archive(&[("index.html", "v42")]);
    source.publish("widget", "42", v42.clone(), signer.sign(&v42));
    let outcome = agent.check_target(&web).await.expect("first deploy");
    assert!(matches!(
        outcome,
        CycleOutcome::Updated { ref release_id, previous: None, retirement: Retirement::NotNeeded }
            if release_id == "42"
    ));
    assert_eq!(read_active(deploy.path(), "web", "index.html"), "v42");
    assert_eq!(
        std::fs::read_link(deploy.path().join("web")).unwrap(),
        std::path::PathBuf::from("web-42")
    );

    let v43 = release_archive(&[("index.html", "v43")]);
    source.publish("widget", "43", v43.clone(), signer.sign(&v43));
    let outcome = agent.check_target(&web).await.expect("second deploy");
    match outcome {
        CycleOutcome::Updated {
            release_id,
            previous,
            retirement,
        } => {
            assert_eq!(release_id, "43");
            assert_eq!(previous.as_deref(), Some("42"));
            assert!(matches!(retirement, Retirement::Retired(_)));
        }
        other => panic!("expected update, got {other:?}"),
    }
    assert_eq!(read_active(deploy.path(), "web", "index.html"), "v43");
    assert_eq!(listing(deploy.path()), vec!["web", "web-43"]);
}

#[tokio::test]
async fn test_same_release_is_up_to_date_without_download() {
    let deploy = tempfile::tempdir().expect("tempdir");
    let signer = TestSigner::new(7);
    let source = ScriptedSource::default();
    let agent = enforcing_agent(&source, &signer, deploy.path());
    let web = target("web", "widget");

    let v1 = release_archive(&[("a", "1")]);
    source.publish("widget", "1", v1.clone(), signer.sign(&v1));
    agent.check_target(&web).await.expect("deploy");
    let downloads_after_deploy = source.downloads().len();

    let outcome = agent.check_target(&web).await.expect("second check");
    assert!(matches!(outcome, CycleOutcome::UpToDate { ref release_id } if release_id == "1"));
    assert_eq!(source.downloads().len(), downloads_after_deploy);
}

#[tokio::test]
async fn test_legacy_signature_is_accepted() {
    let deploy = tempfile::tempdir().expect("tempdir");
    let signer = TestSigner::new(3);
    let source = ScriptedSource::default();
    let agent = enforcing_agent(&source, &signer, deploy.path());

    let v1 = release_archive(&[("a", "1")]);
    source.publish("widget", "1", v1.clone(), signer.sign_legacy(&v1));
    agent
        .check_target(&target("web", "widget"))
        .await
        .expect("legacy signature deploys");
}

// ── Authentication ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_tampered_archive_is_rejected_before_any_fs_change() {
    let deploy = tempfile::tempdir().expect("tempdir");
    let signer = TestSigner::new(7);
    let source = ScriptedSource::default();
    let agent = enforcing_agent(&source, &signer, deploy.path());

    let genuine = release_archive(&[("a", "genuine")]);
    let tampered = release_archive(&[("a", "tampered")]);
    source.publish("widget", "9", tampered, signer.sign(&genuine));

    let err = agent
        .check_target(&target("web", "widget"))
        .await
        .unwrap_err();
    assert!(
        matches!(err, CycleError::Authentication(SignatureError::VerificationFailed)),
        "got: {err}"
    );
    assert!(listing(deploy.path()).is_empty(), "nothing may be written");
}

#[tokio::test]
async fn test_signature_from_other_key_is_rejected() {
    let deploy = tempfile::tempdir().expect("tempdir");
    let trusted = TestSigner::new(7);
    let attacker = TestSigner::new(8);
    let source = ScriptedSource::default();
    let agent = enforcing_agent(&source, &trusted, deploy.path());

    let v1 = release_archive(&[("a", "1")]);
    source.publish("widget", "1", v1.clone(), attacker.sign(&v1));

    let err = agent
        .check_target(&target("web", "widget"))
        .await
        .unwrap_err();
    assert!(matches!(err, CycleError::Authentication(_)), "got: {err}");
    assert!(listing(deploy.path()).is_empty());
}

#[tokio::test]
async fn test_failed_verification_keeps_previous_release_active() {
    let deploy = tempfile::tempdir().expect("tempdir");
    let signer = TestSigner::new(7);
    let source = ScriptedSource::default();
    let agent = enforcing_agent(&source, &signer, deploy.path());
    let web = target("web", "widget");

    let v1 = release_archive(&[("a", "1")]);
    source.publish("widget", "1", v1.clone(), signer.sign(&v1));
    agent.check_target(&web).await.expect("deploy v1");

    let v2 = release_archive(&[("a", "2")]);
    source.publish("widget", "2", v2, signer.sign(&v1));
    assert!(agent.check_target(&web).await.is_err());
    assert_eq!(read_active(deploy.path(), "web", "a"), "1");
    assert_eq!(listing(deploy.path()), vec!["web", "web-1"]);
}

#[tokio::test]
async fn test_malformed_signature_file_is_authentication_error() {
    let deploy = tempfile::tempdir().expect("tempdir");
    let signer = TestSigner::new(7);
    let source = ScriptedSource::default();
    let agent = enforcing_agent(&source, &signer, deploy.path());

    source.publish(
        "widget",
        "1",
        release_archive(&[("a", "1")]),
        b"not a minisign file".to_vec(),
    );
    let err = agent
        .check_target(&target("web", "widget"))
        .await
        .unwrap_err();
    assert!(
        matches!(err, CycleError::Authentication(SignatureError::MalformedSignature(_))),
        "got: {err}"
    );
}

#[tokio::test]
async fn test_unsafe_skip_deploys_unsigned_release() {
    let deploy = tempfile::tempdir().expect("tempdir");
    let source = ScriptedSource::default();
    let agent = agent(&source, Verification::UnsafeSkip, deploy.path());

    source.publish(
        "widget",
        "5",
        release_archive(&[("a", "unsigned")]),
        b"ignored".to_vec(),
    );
    agent
        .check_target(&target("web", "widget"))
        .await
        .expect("deploys without verification");
    assert_eq!(read_active(deploy.path(), "web", "a"), "unsigned");
}

// ── Release shape ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_missing_signature_asset_is_shape_error() {
    let deploy = tempfile::tempdir().expect("tempdir");
    let signer = TestSigner::new(7);
    let source = ScriptedSource::default();
    let agent = enforcing_agent(&source, &signer, deploy.path());

    source.publish_assets(
        "1",
        vec![(asset("widget-1.tar.gz"), release_archive(&[("a", "1")]))],
    );
    let err = agent
        .check_target(&target("web", "widget"))
        .await
        .unwrap_err();
    assert!(
        matches!(err, CycleError::Shape(AssetError::WrongCount { kind: "signature", found: 0 })),
        "got: {err}"
    );
    assert!(err.is_persistent());
    assert!(source.downloads().is_empty());
}

#[tokio::test]
async fn test_two_archives_is_shape_error() {
    let deploy = tempfile::tempdir().expect("tempdir");
    let signer = TestSigner::new(7);
    let source = ScriptedSource::default();
    let agent = enforcing_agent(&source, &signer, deploy.path());

    let archive = release_archive(&[("a", "1")]);
    source.publish_assets(
        "1",
        vec![
            (asset("widget-1.tar.gz"), archive.clone()),
            (asset("widget-1.0.tar.gz"), archive.clone()),
            (asset("widget-1.minisig"), signer.sign(&archive)),
        ],
    );
    let err = agent
        .check_target(&target("web", "widget"))
        .await
        .unwrap_err();
    assert!(
        matches!(err, CycleError::Shape(AssetError::WrongCount { kind: "archive", .. })),
        "got: {err}"
    );
}

#[tokio::test]
async fn test_untrusted_download_host_is_rejected_before_download() {
    let deploy = tempfile::tempdir().expect("tempdir");
    let signer = TestSigner::new(7);
    let source = ScriptedSource::default();
    let agent = enforcing_agent(&source, &signer, deploy.path());

    let archive = release_archive(&[("a", "1")]);
    let mut hostile = asset("widget-1.tar.gz");
    hostile.download_url = "https://evil.example/widget-1.tar.gz".to_string();
    source.publish_assets(
        "1",
        vec![
            (hostile, archive.clone()),
            (asset("widget-1.minisig"), signer.sign(&archive)),
        ],
    );
    let err = agent
        .check_target(&target("web", "widget"))
        .await
        .unwrap_err();
    assert!(
        matches!(err, CycleError::Shape(AssetError::UntrustedHost { .. })),
        "got: {err}"
    );
    assert!(source.downloads().is_empty());
}

// ── Remote and store failures ────────────────────────────────────────────────

#[tokio::test]
async fn test_remote_failure_is_classified_remote() {
    let deploy = tempfile::tempdir().expect("tempdir");
    let signer = TestSigner::new(7);
    let source = ScriptedSource::default();
    let agent = enforcing_agent(&source, &signer, deploy.path());

    let err = agent
        .check_target(&target("web", "widget"))
        .await
        .unwrap_err();
    assert!(matches!(err, CycleError::Remote(_)), "got: {err}");
    assert!(!err.is_persistent());
}

#[tokio::test]
async fn test_corrupted_pointer_is_store_error() {
    let deploy = tempfile::tempdir().expect("tempdir");
    std::fs::create_dir(deploy.path().join("web")).expect("plain dir in pointer slot");
    let signer = TestSigner::new(7);
    let source = ScriptedSource::default();
    let agent = enforcing_agent(&source, &signer, deploy.path());

    let err = agent
        .check_target(&target("web", "widget"))
        .await
        .unwrap_err();
    assert!(matches!(err, CycleError::Store(_)), "got: {err}");
}

#[tokio::test]
async fn test_leftover_release_directory_blocks_redeploy() {
    let deploy = tempfile::tempdir().expect("tempdir");
    std::fs::create_dir(deploy.path().join("web-1")).expect("leftover from a crash");
    let signer = TestSigner::new(7);
    let source = ScriptedSource::default();
    let agent = enforcing_agent(&source, &signer, deploy.path());

    let v1 = release_archive(&[("a", "1")]);
    source.publish("widget", "1", v1.clone(), signer.sign(&v1));
    let err = agent
        .check_target(&target("web", "widget"))
        .await
        .unwrap_err();
    assert!(matches!(err, CycleError::Deploy(_)), "got: {err}");
    assert!(std::fs::symlink_metadata(deploy.path().join("web")).is_err());
}

#[tokio::test]
async fn test_hostile_archive_error_names_offending_entry() {
    let deploy = tempfile::tempdir().expect("tempdir");
    let signer = TestSigner::new(7);
    let source = ScriptedSource::default();
    let agent = enforcing_agent(&source, &signer, deploy.path());

    let hostile = raw_archive(&[("root/a", b"fine"), ("root/../evil", b"pwned")]);
    source.publish("widget", "2", hostile.clone(), signer.sign(&hostile));
    let err = agent
        .check_target(&target("web", "widget"))
        .await
        .unwrap_err();
    assert!(
        matches!(
            err,
            CycleError::Deploy(DeployError::Extraction {
                source: ExtractError::PathTraversal { .. },
                ..
            })
        ),
        "got: {err}"
    );
    let rendered = error_chain(&err);
    assert!(rendered.contains("cannot populate release directory"), "got: {rendered}");
    assert!(rendered.contains("root/../evil"), "got: {rendered}");
    assert!(!deploy.path().join("evil").exists());
    assert!(std::fs::symlink_metadata(deploy.path().join("web")).is_err());
}

// ── Sweep ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_sweep_counts_each_target_outcome() {
    let deploy = tempfile::tempdir().expect("tempdir");
    let signer = TestSigner::new(7);
    let source = ScriptedSource::default();
    let agent = enforcing_agent(&source, &signer, deploy.path());

    let v1 = release_archive(&[("a", "1")]);
    source.publish("widget", "1", v1.clone(), signer.sign(&v1));
    let targets = [
        target("web", "widget"),
        target("api", "widget"),
        target("docs", "other-repo"),
    ];

    let report = agent.sweep(&targets).await;
    assert_eq!((report.updated, report.up_to_date, report.failed), (2, 0, 1));

    let report = agent.sweep(&targets).await;
    assert_eq!((report.updated, report.up_to_date, report.failed), (0, 2, 1));
    assert_eq!(
        listing(deploy.path()),
        vec!["api", "api-1", "web", "web-1"]
    );
}
