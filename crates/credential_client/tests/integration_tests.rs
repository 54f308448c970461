// Copyright 2021-2024 SecureDNA Stiftung (SecureDNA Foundation) <licensing@securedna.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

// Tests of the binaries as a user would run them.
#[cfg(test)]
mod tests {
    use std::fs;
    use std::process::Command;

    use assert_cmd::prelude::{CommandCargoExt, OutputAssertExt};
    use tempfile::TempDir;

    use network_credentials::file::load_bundle_from_file;
    use network_credentials::test_helpers::{write_node, HierarchyBuilder};
    use network_credentials::{decode_transport_form, StoreLayout};

    fn nodes_dir_with_alice() -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        write_node(
            &StoreLayout::new(temp_dir.path()),
            "PartyA",
            &HierarchyBuilder::new("Alice Corp").build(),
        );
        temp_dir
    }

    #[test]
    fn build_bundle_prints_bundle_for_valid_nodes_only() {
        let temp_dir = nodes_dir_with_alice();

        let mut command = Command::cargo_bin("netcred-build-bundle").unwrap();
        command
            .env_remove("NETCRED_CFG_PATH")
            .arg("--nodes-dir")
            .arg(temp_dir.path())
            .args(["--node", "PartyA", "--node", "PartyB"]);
        let output = command.output().unwrap();

        let bundle: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(bundle["PartyA"]["name"], "Alice Corp");
        assert!(bundle.get("PartyB").is_none());
        let identity = bundle["PartyA"]["identity_certs"][0].as_str().unwrap();
        assert!(decode_transport_form(identity).is_ok());

        let stderr = String::from_utf8(output.stderr).unwrap();
        assert!(stderr.contains("Skipped node PartyB"));
    }

    #[test]
    fn build_bundle_reads_toml_config() {
        let temp_dir = nodes_dir_with_alice();
        let cfg_path = temp_dir.path().join("netcred.toml");
        fs::write(
            &cfg_path,
            r#"
nodes_dir = "."
nodes = ["PartyA"]
transport = "skip"
output = "bundle.json"
"#,
        )
        .unwrap();

        let mut command = Command::cargo_bin("netcred-build-bundle").unwrap();
        command.arg("--cfg-path").arg(&cfg_path);
        command.assert().success();

        let bundle = load_bundle_from_file(&temp_dir.path().join("bundle.json")).unwrap();
        let record = bundle.get("PartyA").unwrap();
        assert_eq!(record.name().as_str(), "Alice Corp");
        assert!(record.transport().is_none());
    }

    #[test]
    fn cfg_path_cannot_be_combined_with_other_options() {
        let temp_dir = nodes_dir_with_alice();
        let mut command = Command::cargo_bin("netcred-build-bundle").unwrap();
        command
            .arg("--cfg-path")
            .arg(temp_dir.path().join("netcred.toml"))
            .arg("--nodes-dir")
            .arg(temp_dir.path());
        command.assert().failure();
    }

    #[test]
    fn error_on_unparsable_transport_policy() {
        let temp_dir = nodes_dir_with_alice();
        let mut command = Command::cargo_bin("netcred-build-bundle").unwrap();
        command
            .arg("--nodes-dir")
            .arg(temp_dir.path())
            .args(["--node", "PartyA", "--transport", "sometimes"]);
        let output = command.output().unwrap();
        assert!(!output.status.success());
        let stderr = String::from_utf8(output.stderr).unwrap();
        assert!(stderr.contains("could not parse transport policy"));
    }

    #[test]
    fn inspect_store_shows_entries_as_json() {
        let temp_dir = nodes_dir_with_alice();
        let store = StoreLayout::new(temp_dir.path()).identity_store_path("PartyA");

        let mut command = Command::cargo_bin("netcred-inspect-store").unwrap();
        command.arg(&store).args(["--format", "json"]);
        let output = command.output().unwrap();

        let entries: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        let aliases: Vec<_> = entries
            .as_array()
            .unwrap()
            .iter()
            .map(|entry| entry["alias"].as_str().unwrap().to_owned())
            .collect();
        assert_eq!(aliases, ["cordaclientca", "identity-private-key"]);
        assert_eq!(entries[1]["extractable"], true);
        assert_eq!(entries[1]["organization"], "Alice Corp");
    }
}
