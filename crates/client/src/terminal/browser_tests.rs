// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn wire(name: &str, is_dir: bool) -> WireEntry {
    WireEntry { name: name.to_owned(), is_dir, size: 0, last_mod: 0 }
}

#[test]
fn root_listing_has_no_parent_entry() {
    let mut browser = FileBrowser::default();
    assert!(!browser.has_listing());
    browser.set_listing("/", vec![wire("etc", true), wire("vmlinuz", false)]);

    let names: Vec<&str> = browser.entries().iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["etc", "vmlinuz"]);
    assert_eq!(browser.path(), Some("/"));
    assert_eq!(browser.entries()[0].path, "/etc");
    assert_eq!(browser.entries()[1].kind, EntryKind::File);
}

#[test]
fn nested_listing_materializes_parent_first() {
    let mut browser = FileBrowser::default();
    browser.set_listing("/var", vec![wire("log", true)]);

    let entries = browser.entries();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].kind, EntryKind::Parent);
    assert_eq!(entries[0].name, "..");
    assert_eq!(entries[0].path, "/");
    assert_eq!(entries[1].path, "/var/log");
}

#[test]
fn navigate_parent_directory_and_file() {
    let mut browser = FileBrowser::default();
    browser.set_listing("/var/log", vec![wire("nginx", true), wire("syslog", false)]);

    assert_eq!(browser.navigate(0), Some(Navigation::List("/var".into())));
    assert_eq!(browser.navigate(1), Some(Navigation::List("/var/log/nginx".into())));
    assert_eq!(browser.navigate(2), Some(Navigation::Download("/var/log/syslog".into())));
    assert_eq!(browser.navigate(3), None);
}

#[test]
fn new_listing_replaces_previous() {
    let mut browser = FileBrowser::default();
    browser.set_listing("/var", vec![wire("log", true)]);
    browser.set_listing("/", vec![wire("var", true)]);
    assert_eq!(browser.entries().len(), 1);
    assert_eq!(browser.find("var"), Some(0));
    assert_eq!(browser.find(".."), None);
}

#[yare::parameterized(
    root            = { "/", "/" },
    top_level       = { "/var", "/" },
    nested          = { "/var/log", "/var" },
    trailing_slash  = { "/var/log/", "/var" },
    empty           = { "", "/" },
)]
fn parent_paths(path: &str, expected: &str) {
    assert_eq!(parent_path(path), expected);
}

#[yare::parameterized(
    from_root   = { "/", "etc", "/etc" },
    nested      = { "/etc", "ssh", "/etc/ssh" },
    trailing    = { "/etc/", "ssh", "/etc/ssh" },
    up          = { "/var", "..", "/" },
    up_nested   = { "/var/log", "../lib", "/var/lib" },
    current     = { "/etc", "./ssh", "/etc/ssh" },
)]
fn joined_paths(dir: &str, name: &str, expected: &str) {
    assert_eq!(join_path(dir, name), expected);
}

#[yare::parameterized(
    root            = { "/", "/" },
    empty           = { "", "/" },
    trailing        = { "/var/log/", "/var/log" },
    dot_dot         = { "/var/..", "/" },
    above_root      = { "/../..", "/" },
    dot             = { "/a/./b", "/a/b" },
    doubled_slashes = { "//a//b", "/a/b" },
    relative        = { "a/b", "/a/b" },
    mixed           = { "/a/b/../c/./", "/a/c" },
)]
fn normalized_paths(path: &str, expected: &str) {
    assert_eq!(normalize(path), expected);
}

#[test]
fn listing_of_unfolded_path_points_parent_upward() {
    let mut browser = FileBrowser::default();
    browser.set_listing("/var/log/..", vec![wire("log", true)]);
    assert_eq!(browser.path(), Some("/var"));
    assert_eq!(browser.entries()[0].path, "/");
    assert_eq!(browser.entries()[1].path, "/var/log");

    browser.set_listing("/var/..", vec![wire("var", true)]);
    assert_eq!(browser.path(), Some("/"));
    assert_eq!(browser.find(".."), None);
}

#[yare::parameterized(
    zero      = { 0, "0 B" },
    one_kib   = { 1024, "1024 B" },
    kib       = { 1536, "1.50 KB" },
    mib       = { 5 * 1024 * 1024, "5.00 MB" },
    gib       = { 3 * 1024 * 1024 * 1024 + 1, "3.00 GB" },
)]
fn sizes(bytes: u64, expected: &str) {
    assert_eq!(format_size(bytes), expected);
}

#[test]
fn entry_metadata_helpers() {
    let mut browser = FileBrowser::default();
    browser.set_listing(
        "/srv",
        vec![WireEntry { name: "a.tar".into(), is_dir: false, size: 2048, last_mod: 60 }],
    );
    let parent = &browser.entries()[0];
    let file = &browser.entries()[1];

    assert!(parent.is_dir());
    assert_eq!(parent.display_size(), None);
    assert_eq!(parent.display_modified(), None);

    assert!(!file.is_dir());
    assert_eq!(file.display_size().as_deref(), Some("2.00 KB"));
    assert_eq!(file.display_modified().as_deref(), Some("1970-01-01 00:01:00"));
}

#[yare::parameterized(
    epoch     = { 0, "1970-01-01 00:00:00" },
    leap_day  = { 951_782_400, "2000-02-29 00:00:00" },
    new_year  = { 1_704_067_199, "2023-12-31 23:59:59" },
    recent    = { 1_700_000_000, "2023-11-14 22:13:20" },
)]
fn timestamps(secs: u64, expected: &str) {
    assert_eq!(format_timestamp(secs), expected);
}
