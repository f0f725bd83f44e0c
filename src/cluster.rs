//! Identifies upstreams that are members of the same alertmanager cluster.
//!
//! The fingerprint is a digest over the member names in the order they are
//! reported. Member lists aren't sorted first, two upstreams listing the same
//! members in a different order end up with different fingerprints.
use std::io::{self, Write};

use sha2::{Digest, Sha256};
use thiserror::Error;

/// Error occuring when computing a cluster fingerprint
#[derive(Error, Debug)]
pub enum FingerprintError {
	/// the hasher refused the input
	#[error("failed to hash cluster member {member:?}")]
	Hash {
		member: String,
		#[source]
		source: io::Error,
	},
}

/// computes a cluster fingerprint from an ordered list of member names
pub trait Fingerprinter {
	fn fingerprint(&self, members: &[String]) -> Result<String, FingerprintError>;
}

/// hex encoded sha256 over the concatenated member names
#[derive(Debug, Default, Clone, Copy)]
pub struct Sha256Fingerprinter;

impl Fingerprinter for Sha256Fingerprinter {
	fn fingerprint(&self, members: &[String]) -> Result<String, FingerprintError> {
		let mut hasher = Sha256::new();

		for member in members {
			hasher
				.write_all(member.as_bytes())
				.map_err(|source| FingerprintError::Hash { member: member.clone(), source })?;
		}

		Ok(hex::encode(hasher.finalize()))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn members(names: &[&str]) -> Vec<String> {
		names.iter().map(|name| name.to_string()).collect()
	}

	#[test]
	fn same_members_same_fingerprint() {
		let a = Sha256Fingerprinter.fingerprint(&members(&["am1", "am2"])).unwrap();
		let b = Sha256Fingerprinter.fingerprint(&members(&["am1", "am2"])).unwrap();

		assert_eq!(a, b);
		assert_eq!(a.len(), 64);
	}

	#[test]
	fn member_order_matters() {
		let a = Sha256Fingerprinter.fingerprint(&members(&["am1", "am2"])).unwrap();
		let b = Sha256Fingerprinter.fingerprint(&members(&["am2", "am1"])).unwrap();

		assert_ne!(a, b);
	}

	#[test]
	fn different_members_differ() {
		let a = Sha256Fingerprinter.fingerprint(&members(&["am1"])).unwrap();
		let b = Sha256Fingerprinter.fingerprint(&members(&["am2"])).unwrap();

		assert_ne!(a, b);
	}

	#[test]
	fn names_are_concatenated() {
		let split = Sha256Fingerprinter.fingerprint(&members(&["am", "1"])).unwrap();
		let joined = Sha256Fingerprinter.fingerprint(&members(&["am1"])).unwrap();

		assert_eq!(split, joined);
	}

	#[test]
	fn empty_member_list() {
		let empty = Sha256Fingerprinter.fingerprint(&[]).unwrap();

		assert_eq!(empty, hex::encode(Sha256::digest(b"")));
	}
}
