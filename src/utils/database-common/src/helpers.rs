// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::fmt::Write;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Generates `$N` placeholders for an `IN (...)` list, starting from
/// `index_offset`
pub fn sqlite_generate_placeholders_list(arguments_count: usize, index_offset: usize) -> String {
    let mut result = String::new();

    for i in 0..arguments_count {
        if i > 0 {
            result.push(',');
        }
        let _ = write!(result, "${}", i + index_offset);
    }

    result
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
