// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Provide the policy-driven NLA codec shared by vendor command transports.
// Author: Lukas Bower
#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Netlink-style attribute (NLA) codec driven by a declarative policy.
//!
//! A [`Policy`] describes every attribute a vendor command may carry: its
//! name, numeric type id, optional payload length and primitive kind. The
//! codec maps a [`Dataset`] to a 4-byte aligned TLV stream with [`encode`]
//! and walks such a stream back into a [`Decoded`] mapping with [`decode`].
//! Both functions are pure; the policy is read-only once built.

mod codec;
mod policy;
mod types;

pub use codec::{decode, encode};
pub use policy::{AttrKind, AttributeSpec, DataType, Policy, SchemaEntry};
pub use types::*;
