// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

mod db_transaction_manager;
mod db_transaction_runner;
mod sqlite_transaction_manager;
mod transaction_ref;

pub use db_transaction_manager::*;
pub use db_transaction_runner::*;
pub use sqlite_transaction_manager::*;
pub use transaction_ref::*;
