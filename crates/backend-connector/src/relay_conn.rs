// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connection to the relay's gRPC surface.

use relay_proto::proto::relay_client::RelayClient;
use tonic::transport::Channel;

pub type RelayConn = RelayClient<Channel>;

pub async fn connect(relay_addr: &str) -> anyhow::Result<RelayConn> {
    let endpoint = tonic::transport::Endpoint::from_shared(format!("http://{relay_addr}"))?;
    let channel = endpoint.connect().await?;
    Ok(RelayClient::new(channel))
}
