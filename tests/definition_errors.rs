//! Construction-time validation: the `DefinitionError` variants from
//! spec.md §3's invariants, exercised through the public builder.

use assert_matches::assert_matches;

use lineblock::{BlockDef, DefinitionError, Matcher};

#[test]
fn tail_and_line_count_together_is_rejected() {
    let err = BlockDef::builder()
        .name("both-endings")
        .tail(vec![Matcher::literal("tail")])
        .line_count(3)
        .build()
        .unwrap_err();

    assert_matches!(err, DefinitionError::TailWithLineCount(name) => {
        assert_eq!(name, "both-endings");
    });
}

#[test]
fn all_others_requires_a_head() {
    let err = BlockDef::builder()
        .name("headless")
        .body(vec![Matcher::all_others()])
        .build()
        .unwrap_err();

    assert_matches!(err, DefinitionError::AllOthersWithoutHead(_));
}

#[test]
fn all_others_must_be_last_in_body() {
    let err = BlockDef::builder()
        .name("misplaced")
        .head(vec![Matcher::literal("head")])
        .body(vec![Matcher::all_others(), Matcher::literal("trailing")])
        .build()
        .unwrap_err();

    assert_matches!(err, DefinitionError::AllOthersNotLast(_));
}

#[test]
fn duplicate_all_others_is_rejected() {
    let err = BlockDef::builder()
        .name("doubled")
        .head(vec![Matcher::literal("head")])
        .body(vec![Matcher::all_others(), Matcher::all_others()])
        .build()
        .unwrap_err();

    assert_matches!(err, DefinitionError::AllOthersDuplicated(_));
}

#[test]
fn all_others_in_final_body_slot_with_head_is_accepted() {
    let block = BlockDef::builder()
        .name("ok")
        .head(vec![Matcher::literal("head")])
        .body(vec![Matcher::literal("body"), Matcher::all_others()])
        .build();

    assert_matches!(block, Ok(_));
}

#[test]
fn invalid_regex_surfaces_as_invalid_pattern() {
    let err = Matcher::pattern_named("bad-block", "(unclosed").unwrap_err();
    assert_matches!(err, DefinitionError::InvalidPattern { block, .. } => {
        assert_eq!(block, "bad-block");
    });
}
