// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use proc_macro::TokenStream;
use quote::quote;
use syn::parse::{Parse, ParseStream};
use syn::{Ident, LitStr, Path, Token, parse_macro_input, parse_str};

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
// database_transactional_test!
////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Expands a shared repository fixture into a test bound to one storage.
///
/// ```ignore
/// database_transactional_test!(
///     storage = sqlite,
///     fixture = kamu_quotas_repo_tests::test_create_usage,
///     harness = SqliteQuotaRepositoryHarness
/// );
/// ```
///
/// The `inmem` harness is built with `new()`, the `sqlite` one with
/// `new(sqlite_pool)`. Storage-backed fixtures run inside a single
/// transaction that is committed once the fixture returns.
#[proc_macro]
pub fn database_transactional_test(input: TokenStream) -> TokenStream {
    let DatabaseTransactionalTestInputArgs {
        storage,
        fixture,
        harness,
        extra_test_groups,
    } = parse_macro_input!(input as DatabaseTransactionalTestInputArgs);

    let Some(last_fixture_segment) = fixture.segments.last() else {
        panic!("Fixture path must not be empty");
    };
    let test_function_name = last_fixture_segment.ident.clone();

    let extra_test_groups = if let Some(extra_test_groups) = extra_test_groups {
        match parse_str(extra_test_groups.value().as_str()) {
            Ok(groups) => groups,
            Err(e) => panic!("Malformed \"extra_test_groups\": {e}"),
        }
    } else {
        quote! {}
    };

    let output = match storage.to_string().as_str() {
        "inmem" => quote! {
            #[test_group::group(#extra_test_groups)]
            #[test_log::test(tokio::test)]
            async fn #test_function_name () {
                let harness = #harness ::new();

                #fixture (&harness.catalog).await;
            }
        },
        "sqlite" => quote! {
            #[test_group::group(sqlite, #extra_test_groups)]
            #[test_log::test(sqlx::test(migrations = "../../../../migrations/sqlite"))]
            async fn #test_function_name (sqlite_pool: sqlx::SqlitePool) {
                let harness = #harness ::new(sqlite_pool);

                database_common::DatabaseTransactionRunner::new(harness.catalog)
                    .transactional(|catalog| async move {
                        #fixture (&catalog).await;

                        Ok::<_, internal_error::InternalError>(())
                    })
                    .await
                    .unwrap();
            }
        },
        unexpected => {
            panic!(
                "Unexpected test storage: \"{unexpected}\"!\nAllowable values: \"inmem\" and \
                 \"sqlite\"."
            );
        }
    };

    output.into()
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

struct DatabaseTransactionalTestInputArgs {
    pub storage: Ident,
    pub fixture: Path,
    pub harness: Ident,
    pub extra_test_groups: Option<LitStr>,
}

impl Parse for DatabaseTransactionalTestInputArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut storage = None;
        let mut fixture = None;
        let mut harness = None;
        let mut extra_test_groups = None;

        while !input.is_empty() {
            let key: Ident = input.parse()?;

            input.parse::<Token![=]>()?;

            match key.to_string().as_str() {
                "storage" => storage = Some(input.parse::<Ident>()?),
                "fixture" => fixture = Some(input.parse::<Path>()?),
                "harness" => harness = Some(input.parse::<Ident>()?),
                "extra_test_groups" => extra_test_groups = Some(input.parse::<LitStr>()?),
                unexpected_key => {
                    return Err(syn::Error::new(
                        key.span(),
                        format!(
                            "Unexpected key: {unexpected_key}\nAllowable values: \"storage\", \
                             \"fixture\", \"harness\", and \"extra_test_groups\"."
                        ),
                    ));
                }
            }

            if input.peek(Token![,]) {
                input.parse::<Token![,]>()?;
            }
        }

        let (Some(storage), Some(fixture), Some(harness)) = (storage, fixture, harness) else {
            return Err(input.error(
                "Mandatory parameters \"storage\", \"fixture\" and \"harness\" must be set",
            ));
        };

        Ok(DatabaseTransactionalTestInputArgs {
            storage,
            fixture,
            harness,
            extra_test_groups,
        })
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
