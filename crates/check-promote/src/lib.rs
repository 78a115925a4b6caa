// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Verified-assertion promotion pass.
//!
//! An external verifier sees the module as a numbered list of assertion
//! call sites: every resultless, single-argument, direct call to
//! `__verifier_assert`, counted in module order (functions, then blocks,
//! then instructions, counter starting at 1). When the verifier discharges
//! some of those assertions it reports their numbers back as a
//! comma-separated ID list, conventionally through the `VERIFIED_IDS`
//! environment variable.
//!
//! This pass replays that numbering — the numbering and the rewrite share
//! one traversal, so they cannot drift — and rewrites each verified site
//! into a compiler-visible fact with the same truth value:
//!
//! ```text
//! call @__verifier_assert(%c)      ; site n, n in the verified set
//! ```
//!
//! becomes
//!
//! ```text
//! %t = icmp ne %c, 0
//! call @builtin.trust(%t)
//! ```
//!
//! and the assertion call disappears. Sites outside the set keep their
//! runtime check. IDs that match no site are ignored; an empty or absent
//! set rewrites nothing.
//!
//! Independently of the set, the pass restores the `entry` function for
//! downstream optimization: external linkage, do-not-optimize marking
//! cleared. Hardened pipelines park `entry` as internal+optnone while the
//! verifier works on it; this is the step that unparks it.

mod ids;
mod promote;

pub use ids::{IdSetError, VerifiedIds, VERIFIED_IDS_VAR};
pub use promote::{assertion_sites, promote, restore_entry, AssertionSite, PromotionSummary};
