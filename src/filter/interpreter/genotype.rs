//! Genotype completeness and pattern checks.

use enum_map::EnumMap;

use crate::filter::{
    record::{VariantRecord, MISSING},
    registry::RoleSample,
    schema::Role,
};

/// Allele tokens of a genotype string, phased or unphased.
fn alleles(gt: &str) -> impl Iterator<Item = &str> {
    gt.split(['/', '|'])
}

/// Number of times allele number `allele_no` is called in `gt`.
pub fn allele_count(gt: &str, allele_no: usize) -> usize {
    let allele = allele_no.to_string();
    alleles(gt).filter(|token| *token == allele).count()
}

/// Whether all allele tokens of `gt` are missing.
pub fn is_no_call(gt: &str) -> bool {
    alleles(gt).all(|token| token == MISSING || token.is_empty())
}

/// Whether the called allele count satisfies `role`.
pub fn role_accepts(role: Role, count: usize) -> bool {
    match role {
        Role::Alternate => count == 2,
        Role::Heterozygous => count == 1,
        Role::Reference => count == 0,
        Role::NotReference => count >= 1,
        Role::NotAlternate => count < 2,
        Role::Unfiltered => true,
    }
}

/// No gating sample may have a no-call.
pub fn complete(record: &VariantRecord, roles: &EnumMap<Role, Vec<RoleSample>>) -> bool {
    roles
        .iter()
        .filter(|(role, _)| role.is_gating())
        .flat_map(|(_, samples)| samples.iter())
        .all(|sample| !is_no_call(record.genotype(sample.index)))
}

/// Whether all gating samples have the genotype their role requires for `allele_no`.
pub fn passes(
    record: &VariantRecord,
    roles: &EnumMap<Role, Vec<RoleSample>>,
    allele_no: usize,
) -> bool {
    roles.iter().all(|(role, samples)| {
        samples.iter().all(|sample| {
            let count = allele_count(record.genotype(sample.index), allele_no);
            let result = role_accepts(role, count);
            if !result {
                tracing::trace!(
                    "sample {} ({}) with count {} of allele {} fails genotype pattern",
                    &sample.name,
                    role,
                    count,
                    allele_no
                );
            }
            result
        })
    })
}

#[cfg(test)]
mod test {
    use enum_map::EnumMap;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::{allele_count, complete, is_no_call, passes, role_accepts};
    use crate::filter::{record::VariantRecord, registry::RoleSample, schema::Role};

    #[rstest]
    #[case("1/1", 1, 2)]
    #[case("1|1", 1, 2)]
    #[case("0/1", 1, 1)]
    #[case("1/2", 1, 1)]
    #[case("1/2", 2, 1)]
    #[case("0/0", 1, 0)]
    #[case("10/10", 1, 0)]
    #[case("10/1", 10, 1)]
    #[case("./.", 1, 0)]
    #[case("1", 1, 1)]
    #[case("1/1/1", 1, 3)]
    fn allele_count_exact_tokens(
        #[case] gt: &str,
        #[case] allele_no: usize,
        #[case] expected: usize,
    ) {
        assert_eq!(allele_count(gt, allele_no), expected);
    }

    #[rstest]
    #[case("./.", true)]
    #[case(".|.", true)]
    #[case(".", true)]
    #[case("./1", false)]
    #[case("0/0", false)]
    fn no_call(#[case] gt: &str, #[case] expected: bool) {
        assert_eq!(is_no_call(gt), expected);
    }

    #[rstest]
    #[case(Role::Alternate, [false, false, true, false])]
    #[case(Role::Heterozygous, [false, true, false, false])]
    #[case(Role::Reference, [true, false, false, false])]
    #[case(Role::NotReference, [false, true, true, true])]
    #[case(Role::NotAlternate, [true, true, false, false])]
    #[case(Role::Unfiltered, [true, true, true, true])]
    fn role_table(#[case] role: Role, #[case] expected: [bool; 4]) {
        let actual = [0, 1, 2, 3].map(|count| role_accepts(role, count));
        assert_eq!(actual, expected);
    }

    fn roles(assignments: &[(Role, usize)]) -> EnumMap<Role, Vec<RoleSample>> {
        let mut result: EnumMap<Role, Vec<RoleSample>> = EnumMap::default();
        for (role, index) in assignments {
            result[*role].push(RoleSample::new(format!("S{}", index), *index));
        }
        result
    }

    fn record(samples: &[&str]) -> VariantRecord {
        VariantRecord::parse(
            &format!("1\t100\t.\tA\tG,T\t50\tPASS\tDP=10\tGT\t{}", samples.join("\t")),
            1,
        )
        .expect("valid test record")
    }

    #[test]
    fn alternate_role_distinguishes_alleles() {
        let roles = roles(&[(Role::Alternate, 0)]);

        assert!(passes(&record(&["1/1"]), &roles, 1));
        assert!(!passes(&record(&["1/2"]), &roles, 1));
        assert!(!passes(&record(&["1/2"]), &roles, 2));
        assert!(passes(&record(&["2|2"]), &roles, 2));
    }

    #[test]
    fn empty_roles_pass() {
        assert!(passes(&record(&["./."]), &roles(&[]), 1));
        assert!(complete(&record(&["./."]), &roles(&[])));
    }

    #[test]
    fn trio_pattern() {
        let roles = roles(&[
            (Role::Reference, 0),
            (Role::Heterozygous, 1),
            (Role::NotAlternate, 2),
        ]);

        assert!(passes(&record(&["0/0", "0/1", "0/1"]), &roles, 1));
        assert!(passes(&record(&["0/0", "0/1", "0/0"]), &roles, 1));
        assert!(!passes(&record(&["0/0", "0/1", "1/1"]), &roles, 1));
        assert!(!passes(&record(&["0/1", "0/1", "0/0"]), &roles, 1));
    }

    #[test]
    fn unfiltered_no_call_does_not_break_completeness() {
        let roles = roles(&[(Role::Heterozygous, 0), (Role::Unfiltered, 1)]);

        assert!(complete(&record(&["0/1", "./."]), &roles));
        assert!(!complete(&record(&["./.", "0/1"]), &roles));
    }
}
