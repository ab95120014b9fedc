// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::config::Config;
use crate::relay_conn::RelayConn;

pub struct EdgeState {
    pub relay: RelayConn,
    pub config: Config,
}
