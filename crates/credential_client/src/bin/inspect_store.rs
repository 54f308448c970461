// Copyright 2021-2024 SecureDNA Stiftung (SecureDNA Foundation) <licensing@securedna.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

use clap::Parser;
use std::io::stderr;
use std::io::stdout;
use tracing_subscriber::EnvFilter;

use credential_client::shims::inspect_store;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let opts = inspect_store::InspectStoreOpts::parse();
    inspect_store::main(&opts, &mut stdout(), &mut stderr())?;
    Ok(())
}
