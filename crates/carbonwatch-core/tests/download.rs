// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of CarbonWatch.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

//! Download loop against a mock API server

use carbonwatch_core::{
    CarbonIntensityClient, ClientSettings, DownloadOptions, SnapshotStore, StopReason,
    run_download,
};
use carbonwatch_types::Endpoint;
use chrono::{TimeZone, Utc};
use mockito::Server;
use std::time::Duration;
use tempfile::TempDir;

const BODY: &str = r#"{"data":[{"from":"2023-03-09T20:00Z","to":"2023-03-09T20:30Z",
    "intensity":{"forecast":186,"actual":null,"index":"moderate"}}]}"#;

fn client(server: &Server) -> CarbonIntensityClient {
    CarbonIntensityClient::new(&ClientSettings {
        base_url: server.url(),
        ..ClientSettings::default()
    })
    .unwrap()
}

fn options(num_files: usize) -> DownloadOptions {
    DownloadOptions {
        endpoint: Endpoint::NationalFw48h,
        region: None,
        start: Utc.with_ymd_and_hms(2023, 3, 9, 20, 0, 0).unwrap(),
        end: Utc.with_ymd_and_hms(2023, 3, 9, 21, 0, 0).unwrap(),
        num_files,
        max_retries: 1,
        retry_delay: Duration::ZERO,
    }
}

fn ok_mock(server: &mut Server, path: &str) -> mockito::Mock {
    server
        .mock("GET", path)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(BODY)
        .create()
}

#[test]
fn test_download_window() {
    let mut server = Server::new();
    let m1 = ok_mock(&mut server, "/intensity/2023-03-09T20:01Z/fw48h");
    let m2 = ok_mock(&mut server, "/intensity/2023-03-09T20:31Z/fw48h");
    let m3 = ok_mock(&mut server, "/intensity/2023-03-09T21:01Z/fw48h");

    let temp = TempDir::new().unwrap();
    let store = SnapshotStore::new(temp.path().join("data"));
    let report = run_download(&client(&server), &store, &options(0)).unwrap();

    m1.assert();
    m2.assert();
    m3.assert();
    assert_eq!(report.succeeded, 3);
    assert_eq!(report.stopped, None);
    let files = store.list_snapshots().unwrap();
    assert_eq!(files.len(), 3);
    assert!(files[0].ends_with("2023-03-09T2001Z.json"));
}

#[test]
fn test_existing_files_are_not_refetched() {
    let mut server = Server::new();
    let fetched = ok_mock(&mut server, "/intensity/2023-03-09T20:31Z/fw48h");

    let temp = TempDir::new().unwrap();
    let store = SnapshotStore::new(temp.path());
    std::fs::write(temp.path().join("2023-03-09T2001Z.json"), "kept").unwrap();

    let report = run_download(&client(&server), &store, &options(2)).unwrap();
    fetched.assert();
    assert_eq!((report.succeeded, report.skipped), (1, 1));
    assert_eq!(report.stopped, Some(StopReason::FileLimit));
    assert_eq!(
        std::fs::read_to_string(temp.path().join("2023-03-09T2001Z.json")).unwrap(),
        "kept"
    );
}

#[test]
fn test_empty_response_stops_batch() {
    let mut server = Server::new();
    let _first = ok_mock(&mut server, "/intensity/2023-03-09T20:01Z/fw48h");
    let _empty = server
        .mock("GET", "/intensity/2023-03-09T20:31Z/fw48h")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"data":[]}"#)
        .create();

    let temp = TempDir::new().unwrap();
    let store = SnapshotStore::new(temp.path());
    let report = run_download(&client(&server), &store, &options(0)).unwrap();

    assert_eq!(report.succeeded, 1);
    assert_eq!(report.stopped, Some(StopReason::NoMoreData));
    assert!(!temp.path().join("2023-03-09T2031Z.json").exists());
}

#[test]
fn test_failure_retried_then_reported() {
    let mut server = Server::new();
    let failing = server
        .mock("GET", "/intensity/2023-03-09T20:01Z/fw48h")
        .with_status(503)
        .expect(2)
        .create();

    let temp = TempDir::new().unwrap();
    let store = SnapshotStore::new(temp.path());
    let report = run_download(&client(&server), &store, &options(0)).unwrap();

    failing.assert();
    assert_eq!(report.failed, 1);
    assert!(matches!(report.stopped, Some(StopReason::FetchFailed(_))));
    assert!(!report.is_clean());
    assert!(store.list_snapshots().unwrap().is_empty());
}
