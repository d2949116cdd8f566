// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Privacy levels and the masking policy applied to captured DOM content.

use serde::{Deserialize, Serialize};

/// Character every lowercase letter is replaced with under [`PrivacyLevel::Mask`].
pub const MASK_CHAR: char = '*';

/// Marker class applied to the document root when text masking is active,
/// enabling complementary CSS-level masking.
pub const MASKED_ROOT_CLASS: &str = "weft-masked";

/// Privacy level configured for a recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PrivacyLevel {
	/// Full DOM content is captured.
	Allow,
	/// Form-input values are masked.
	MaskUserInput,
	/// Form-input values and text content are masked.
	Mask,
}

impl PrivacyLevel {
	/// Parses a privacy tag. Unrecognized tags fall back to the default.
	pub fn from_tag(tag: &str) -> Self {
		match tag {
			"allow" => PrivacyLevel::Allow,
			"mask" => PrivacyLevel::Mask,
			_ => PrivacyLevel::MaskUserInput,
		}
	}

	/// Returns the string representation of this level.
	pub fn as_str(&self) -> &'static str {
		match self {
			PrivacyLevel::Allow => "allow",
			PrivacyLevel::MaskUserInput => "mask-user-input",
			PrivacyLevel::Mask => "mask",
		}
	}
}

impl Default for PrivacyLevel {
	fn default() -> Self {
		PrivacyLevel::MaskUserInput
	}
}

impl std::fmt::Display for PrivacyLevel {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.as_str())
	}
}

/// Text-masking rule applied to text nodes.
pub type TextMask = fn(&str) -> String;

/// Replaces every lowercase ASCII letter with [`MASK_CHAR`], leaving other
/// characters untouched.
pub fn mask_text(input: &str) -> String {
	input
		.chars()
		.map(|c| if c.is_ascii_lowercase() { MASK_CHAR } else { c })
		.collect()
}

/// Recorder configuration fragment selected from a privacy level.
///
/// Selection is pure, deterministic, and idempotent: the same level always
/// yields the same policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MaskingPolicy {
	/// Mask all form-input values.
	pub mask_all_inputs: bool,
	/// Replace lowercase text content via [`mask_text`].
	pub mask_text: bool,
	/// Apply [`MASKED_ROOT_CLASS`] to the document root.
	pub root_marker: bool,
}

impl MaskingPolicy {
	/// Selects the policy for a privacy level.
	pub fn for_level(level: PrivacyLevel) -> Self {
		match level {
			PrivacyLevel::Allow => Self::default(),
			PrivacyLevel::MaskUserInput => Self {
				mask_all_inputs: true,
				..Self::default()
			},
			PrivacyLevel::Mask => Self {
				mask_all_inputs: true,
				mask_text: true,
				root_marker: true,
			},
		}
	}

	/// The text-masking rule, present only when text masking is selected.
	pub fn text_mask(&self) -> Option<TextMask> {
		self.mask_text.then_some(mask_text as TextMask)
	}
}
