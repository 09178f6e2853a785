//! Identity-matched minimal edit computation.
//!
//! Myers O(ND) difference over item identities: trim common affixes, find a
//! middle-snake split via simultaneous forward/reverse path search, recurse
//! into the halves, and fall back to delete-all/insert-all when the two
//! ranges share nothing. A final content pass turns identity-matched but
//! content-different pairs into `Change` ops with merged payloads.

use crate::item::{DiffItem, same_identity};
use crate::script::{EditOp, EditScript};

/// Aligned run between the two sequences, in sequence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Run {
	/// `n` identity-matched pairs.
	Keep(usize),
	/// `n` items present only in the old sequence.
	Del(usize),
	/// `n` items present only in the new sequence.
	Ins(usize),
}

/// Computes the edit script transforming `old` into `new`.
pub(crate) fn diff_items<T: DiffItem>(old: &[T], new: &[T]) -> EditScript<T::Payload> {
	let mut runs = Vec::new();
	diff_range(old, new, &mut runs);
	let runs = normalize(runs);
	build_script(old, new, &runs)
}

/// Diffs one aligned range: trim common prefix/suffix, then split or fall
/// back on the middle block.
fn diff_range<T: DiffItem>(old: &[T], new: &[T], out: &mut Vec<Run>) {
	let mut p = 0;
	let max_p = old.len().min(new.len());
	while p < max_p && same_identity(&old[p], &new[p]) {
		p += 1;
	}
	if p > 0 {
		out.push(Run::Keep(p));
	}
	let (old, new) = (&old[p..], &new[p..]);

	let mut s = 0;
	let max_s = old.len().min(new.len());
	while s < max_s && same_identity(&old[old.len() - 1 - s], &new[new.len() - 1 - s]) {
		s += 1;
	}
	let (old_mid, new_mid) = (&old[..old.len() - s], &new[..new.len() - s]);

	diff_middle(old_mid, new_mid, out);
	if s > 0 {
		out.push(Run::Keep(s));
	}
}

fn diff_middle<T: DiffItem>(old: &[T], new: &[T], out: &mut Vec<Run>) {
	if old.is_empty() {
		if !new.is_empty() {
			out.push(Run::Ins(new.len()));
		}
		return;
	}
	if new.is_empty() {
		out.push(Run::Del(old.len()));
		return;
	}
	if old.len() == 1 && new.len() == 1 {
		// Post-trim singletons cannot identity-match.
		out.push(Run::Del(1));
		out.push(Run::Ins(1));
		return;
	}
	if let Some((x, y)) = bisect(old, new) {
		diff_range(&old[..x], &new[..y], out);
		diff_range(&old[x..], &new[y..], out);
	} else {
		// No common element between the two ranges.
		out.push(Run::Del(old.len()));
		out.push(Run::Ins(new.len()));
	}
}

/// Finds a middle-snake split point by walking forward and reverse D-paths
/// simultaneously. Returns `None` when the ranges share no element.
fn bisect<T: DiffItem>(old: &[T], new: &[T]) -> Option<(usize, usize)> {
	let n1 = old.len() as i64;
	let n2 = new.len() as i64;
	let max_d = (old.len() + new.len()).div_ceil(2) as i64;
	let v_offset = max_d;
	let v_len = (2 * max_d) as usize;

	let mut v1 = vec![-1i64; v_len];
	let mut v2 = vec![-1i64; v_len];
	v1[(v_offset + 1) as usize] = 0;
	v2[(v_offset + 1) as usize] = 0;

	let delta = n1 - n2;
	// When delta is odd, overlap can only be detected on the forward path.
	let front = delta % 2 != 0;

	let mut k1start = 0i64;
	let mut k1end = 0i64;
	let mut k2start = 0i64;
	let mut k2end = 0i64;

	let eq = |i: i64, j: i64| same_identity(&old[i as usize], &new[j as usize]);

	for d in 0..max_d {
		// Forward path.
		let mut k1 = -d + k1start;
		while k1 <= d - k1end {
			let k1o = (v_offset + k1) as usize;
			let mut x1 = if k1 == -d || (k1 != d && v1[k1o - 1] < v1[k1o + 1]) {
				v1[k1o + 1]
			} else {
				v1[k1o - 1] + 1
			};
			let mut y1 = x1 - k1;
			while x1 < n1 && y1 < n2 && eq(x1, y1) {
				x1 += 1;
				y1 += 1;
			}
			v1[k1o] = x1;
			if x1 > n1 {
				k1end += 2;
			} else if y1 > n2 {
				k1start += 2;
			} else if front {
				let k2o = v_offset + delta - k1;
				if (0..v_len as i64).contains(&k2o) && v2[k2o as usize] != -1 && x1 >= n1 - v2[k2o as usize] {
					return Some((x1 as usize, y1 as usize));
				}
			}
			k1 += 2;
		}

		// Reverse path.
		let mut k2 = -d + k2start;
		while k2 <= d - k2end {
			let k2o = (v_offset + k2) as usize;
			let mut x2 = if k2 == -d || (k2 != d && v2[k2o - 1] < v2[k2o + 1]) {
				v2[k2o + 1]
			} else {
				v2[k2o - 1] + 1
			};
			let mut y2 = x2 - k2;
			while x2 < n1 && y2 < n2 && eq(n1 - 1 - x2, n2 - 1 - y2) {
				x2 += 1;
				y2 += 1;
			}
			v2[k2o] = x2;
			if x2 > n1 {
				k2end += 2;
			} else if y2 > n2 {
				k2start += 2;
			} else if !front {
				let k1o = v_offset + delta - k2;
				if (0..v_len as i64).contains(&k1o) && v1[k1o as usize] != -1 {
					let x1 = v1[k1o as usize];
					let y1 = v_offset + x1 - k1o;
					// Skip diagonals whose stored point ran off the grid.
					if x1 <= n1 && (0..=n2).contains(&y1) && x1 >= n1 - x2 {
						return Some((x1 as usize, y1 as usize));
					}
				}
			}
			k2 += 2;
		}
	}

	None
}

/// Merges adjacent runs of the same type and discards empty runs.
fn normalize(runs: Vec<Run>) -> Vec<Run> {
	let mut result: Vec<Run> = Vec::with_capacity(runs.len());
	for run in runs {
		let count = match run {
			Run::Keep(n) | Run::Del(n) | Run::Ins(n) => n,
		};
		if count == 0 {
			continue;
		}
		match (result.last_mut(), run) {
			(Some(Run::Keep(acc)), Run::Keep(n)) | (Some(Run::Del(acc)), Run::Del(n)) | (Some(Run::Ins(acc)), Run::Ins(n)) => *acc += n,
			_ => result.push(run),
		}
	}
	result
}

/// Converts aligned runs into an edit script in working coordinates.
///
/// `pos` tracks the working position; for every op emitted, the working
/// prefix before `pos` already equals the new sequence's prefix, which is
/// what lets `Insert`/`Change` pull items from `new` by position.
fn build_script<T: DiffItem>(old: &[T], new: &[T], runs: &[Run]) -> EditScript<T::Payload> {
	let mut script = EditScript::new();
	let mut oi = 0usize;
	let mut ni = 0usize;
	let mut pos = 0usize;

	for run in runs {
		match *run {
			Run::Keep(n) => {
				push_changes(old, new, oi, ni, pos, n, &mut script);
				oi += n;
				ni += n;
				pos += n;
			}
			Run::Del(n) => {
				script.push(EditOp::Remove { pos, count: n });
				oi += n;
			}
			Run::Ins(n) => {
				script.push(EditOp::Insert { pos, count: n });
				ni += n;
				pos += n;
			}
		}
	}
	script
}

/// Emits `Change` ops for content-different pairs inside one kept run,
/// batching adjacent changes whose payloads are equal.
fn push_changes<T: DiffItem>(old: &[T], new: &[T], oi: usize, ni: usize, pos: usize, n: usize, script: &mut EditScript<T::Payload>) {
	let mut k = 0;
	while k < n {
		if old[oi + k].same_content(&new[ni + k]) {
			k += 1;
			continue;
		}
		let start = k;
		let payload = old[oi + k].payload_delta(&new[ni + k]);
		k += 1;
		while k < n && !old[oi + k].same_content(&new[ni + k]) && old[oi + k].payload_delta(&new[ni + k]) == payload {
			k += 1;
		}
		script.push(EditOp::Change {
			pos: pos + start,
			count: k - start,
			payload,
		});
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testutil::{Row, rows};

	fn diff(old: &[Row], new: &[Row]) -> EditScript<u32> {
		diff_items(old, new)
	}

	fn assert_round_trip(old: &[Row], new: &[Row]) {
		let script = diff(old, new);
		let mut work = old.to_vec();
		script.apply_to(&mut work, new);
		assert_eq!(work, new, "script {script:?} failed to rebuild target");
	}

	// ── Golden scripts ──

	#[test]
	fn remove_then_insert_scenario() {
		// [A,B,C] -> [A,C,D]: A and C identity-match.
		let old = rows(&[1, 2, 3]);
		let new = rows(&[1, 3, 4]);
		let script = diff(&old, &new);
		assert_eq!(script.ops(), &[EditOp::Remove { pos: 1, count: 1 }, EditOp::Insert { pos: 2, count: 1 }]);
		assert_round_trip(&old, &new);
	}

	#[test]
	fn identical_sequences_yield_empty_script() {
		let old = rows(&[1, 2, 3]);
		assert!(diff(&old, &old).is_empty());
	}

	#[test]
	fn empty_to_full_is_one_insert() {
		let new = rows(&[1, 2, 3]);
		let script = diff(&[], &new);
		assert_eq!(script.ops(), &[EditOp::Insert { pos: 0, count: 3 }]);
	}

	#[test]
	fn full_to_empty_is_one_remove() {
		let old = rows(&[1, 2]);
		let script = diff(&old, &[]);
		assert_eq!(script.ops(), &[EditOp::Remove { pos: 0, count: 2 }]);
	}

	#[test]
	fn disjoint_sequences_replace_wholesale() {
		let old = rows(&[1, 2]);
		let new = rows(&[3, 4, 5]);
		let script = diff(&old, &new);
		assert_eq!(script.ops(), &[EditOp::Remove { pos: 0, count: 2 }, EditOp::Insert { pos: 0, count: 3 }]);
		assert_round_trip(&old, &new);
	}

	#[test]
	fn content_change_on_matched_pair_emits_change() {
		let old = vec![Row::with_rev(1, 0), Row::with_rev(2, 0)];
		let new = vec![Row::with_rev(1, 0), Row::with_rev(2, 5)];
		let script = diff(&old, &new);
		assert_eq!(
			script.ops(),
			&[EditOp::Change {
				pos: 1,
				count: 1,
				payload: Some(5)
			}]
		);
		assert_round_trip(&old, &new);
	}

	#[test]
	fn adjacent_changes_with_equal_payloads_merge() {
		let old = vec![Row::with_rev(1, 0), Row::with_rev(2, 0), Row::with_rev(3, 0)];
		let new = vec![Row::with_rev(1, 7), Row::with_rev(2, 7), Row::with_rev(3, 0)];
		let script = diff(&old, &new);
		assert_eq!(
			script.ops(),
			&[EditOp::Change {
				pos: 0,
				count: 2,
				payload: Some(7)
			}]
		);
	}

	#[test]
	fn adjacent_changes_with_distinct_payloads_split() {
		let old = vec![Row::with_rev(1, 0), Row::with_rev(2, 0)];
		let new = vec![Row::with_rev(1, 3), Row::with_rev(2, 4)];
		let script = diff(&old, &new);
		assert_eq!(script.len(), 2);
		assert_round_trip(&old, &new);
	}

	#[test]
	fn change_inside_structural_edit_round_trips() {
		let old = vec![Row::with_rev(1, 0), Row::with_rev(2, 0), Row::with_rev(3, 0)];
		let new = vec![Row::with_rev(2, 9), Row::with_rev(4, 0), Row::with_rev(3, 0)];
		assert_round_trip(&old, &new);
	}

	#[test]
	fn deterministic_across_invocations() {
		let old = rows(&[1, 2, 3, 4, 5, 6]);
		let new = rows(&[6, 2, 7, 4, 1]);
		assert_eq!(diff(&old, &new), diff(&old, &new));
		assert_round_trip(&old, &new);
	}

	// ── Randomized round-trip stress (deterministic xorshift) ──

	struct Xorshift64(u64);

	impl Xorshift64 {
		fn next(&mut self) -> u64 {
			let mut x = self.0;
			x ^= x << 13;
			x ^= x >> 7;
			x ^= x << 17;
			self.0 = x;
			x
		}

		fn below(&mut self, bound: usize) -> usize {
			(self.next() % bound.max(1) as u64) as usize
		}
	}

	#[test]
	fn stress_random_edits_round_trip() {
		let mut rng = Xorshift64(0x5EED_CAFE);
		for case in 0u64..200 {
			let old_len = rng.below(24);
			let old: Vec<Row> = (0..old_len).map(|i| Row::new(i as u64)).collect();

			// Derive new: drop some, bump some revs, inject fresh ids, swap a pair.
			let mut new: Vec<Row> = old.iter().copied().filter(|_| rng.below(4) != 0).collect();
			for item in new.iter_mut() {
				if rng.below(3) == 0 {
					item.rev += 1;
				}
			}
			let inserts = rng.below(6);
			for i in 0..inserts {
				let at = rng.below(new.len() + 1);
				new.insert(at, Row::new(1000 + case * 10 + i as u64));
			}
			if new.len() >= 2 {
				let a = rng.below(new.len());
				let b = rng.below(new.len());
				new.swap(a, b);
			}

			assert_round_trip(&old, &new);
		}
	}
}
