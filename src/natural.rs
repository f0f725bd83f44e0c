//! Natural string ordering: runs of ascii digits are compared by their numeric
//! value, everything else character by character. `"v2" < "v10"`.
use std::{cmp::Ordering, iter::Peekable, str::Chars};

/// a run of digits or a single non digit character
#[derive(Debug, PartialEq, Eq)]
enum Chunk<'a> {
	Number(&'a str),
	Char(char),
}

/// splits a string into [Chunk]s
struct Chunks<'a> {
	src: &'a str,
	pos: usize,
	chars: Peekable<Chars<'a>>,
}

impl<'a> Chunks<'a> {
	fn new(src: &'a str) -> Self {
		Self { src, pos: 0, chars: src.chars().peekable() }
	}
}

impl<'a> Iterator for Chunks<'a> {
	type Item = Chunk<'a>;

	fn next(&mut self) -> Option<Self::Item> {
		let c = self.chars.next()?;
		let start = self.pos;
		self.pos += c.len_utf8();

		if !c.is_ascii_digit() {
			return Some(Chunk::Char(c));
		}

		while let Some(c) = self.chars.next_if(char::is_ascii_digit) {
			self.pos += c.len_utf8();
		}

		Some(Chunk::Number(&self.src[start..self.pos]))
	}
}

/// compares two digit runs by value without parsing them, so arbitrary long
/// runs never overflow. Equal values with more leading zeros sort last.
fn cmp_numbers(a: &str, b: &str) -> Ordering {
	let a_trimmed = a.trim_start_matches('0');
	let b_trimmed = b.trim_start_matches('0');

	a_trimmed
		.len()
		.cmp(&b_trimmed.len())
		.then_with(|| a_trimmed.cmp(b_trimmed))
		.then_with(|| a.len().cmp(&b.len()))
}

/// Total natural ordering of two strings.
///
/// A digit run sorts before any other character at the same position. Strings
/// that compare equal chunk by chunk are ordered bytewise so the ordering is
/// consistent with `==`.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
	let mut left = Chunks::new(a);
	let mut right = Chunks::new(b);

	loop {
		let ordering = match (left.next(), right.next()) {
			(None, None) => return a.cmp(b),
			(None, Some(_)) => return Ordering::Less,
			(Some(_), None) => return Ordering::Greater,
			(Some(Chunk::Number(l)), Some(Chunk::Number(r))) => cmp_numbers(l, r),
			(Some(Chunk::Number(_)), Some(Chunk::Char(_))) => Ordering::Less,
			(Some(Chunk::Char(_)), Some(Chunk::Number(_))) => Ordering::Greater,
			(Some(Chunk::Char(l)), Some(Chunk::Char(r))) => l.cmp(&r),
		};

		if ordering != Ordering::Equal {
			return ordering;
		}
	}
}
