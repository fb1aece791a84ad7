//! Integration tests for `autodeploy verify`.

#![allow(clippy::expect_used)]

use std::path::PathBuf;

use predicates::prelude::*;

use crate::helpers::{TestSigner, release_archive};
use crate::{autodeploy, write_config};

fn write_release(dir: &tempfile::TempDir, archive: &[u8], signature: &[u8]) -> (PathBuf, PathBuf) {
    let archive_path = dir.path().join("widget-1.tar.gz");
    let signature_path = dir.path().join("widget-1.minisig");
    std::fs::write(&archive_path, archive).expect("write archive");
    std::fs::write(&signature_path, signature).expect("write signature");
    (archive_path, signature_path)
}

#[test]
fn test_verify_valid_signature_succeeds() {
    let dir = tempfile::tempdir().expect("tempdir");
    let signer = TestSigner::new(5);
    let config = write_config(&dir, false, Some(&signer.public_key()));
    let archive = release_archive(&[("a", "1")]);
    let (archive_path, signature_path) = write_release(&dir, &archive, &signer.sign(&archive));

    autodeploy()
        .arg("--config")
        .arg(&config)
        .arg("verify")
        .arg("--archive")
        .arg(&archive_path)
        .arg("--signature")
        .arg(&signature_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("signature valid"));
}

#[test]
fn test_verify_tampered_archive_fails() {
    let dir = tempfile::tempdir().expect("tempdir");
    let signer = TestSigner::new(5);
    let config = write_config(&dir, false, Some(&signer.public_key()));
    let archive = release_archive(&[("a", "1")]);
    let signature = signer.sign(&archive);
    let (archive_path, signature_path) =
        write_release(&dir, &release_archive(&[("a", "2")]), &signature);

    autodeploy()
        .arg("--config")
        .arg(&config)
        .arg("verify")
        .arg("--archive")
        .arg(&archive_path)
        .arg("--signature")
        .arg(&signature_path)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("signature verification failed"));
}

#[test]
fn test_verify_without_configured_key_fails() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = write_config(&dir, true, None);
    let (archive_path, signature_path) = write_release(&dir, b"archive", b"sig");

    autodeploy()
        .arg("--config")
        .arg(&config)
        .arg("verify")
        .arg("--archive")
        .arg(&archive_path)
        .arg("--signature")
        .arg(&signature_path)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("no public signing key configured"));
}
