//! Round-robin group assignment policy.
//!
//! The policy is a pure function of two numbers: how many participants have
//! already revealed their assignment, and how many groups the event is
//! configured with. Each new reveal lands in the next group in cycle order,
//! which produces an even fill without tracking per-group counts.

/// Assign a group number for the next participant to reveal.
///
/// `scratched_count` is the number of participants already assigned (before
/// this one). `number_of_groups` is clamped to a minimum of 1 so a
/// misconfigured event cannot divide by zero.
///
/// The result is always in `[1, max(1, number_of_groups)]`.
pub fn assign_group(scratched_count: u64, number_of_groups: u32) -> u32 {
    let groups = number_of_groups.max(1);
    (scratched_count % u64::from(groups)) as u32 + 1
}
