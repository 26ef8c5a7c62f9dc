use cdm_sequencer::DrugIngredientMapping;

use crate::utils::{CdmFixture, concept, concept_ancestor};

#[test]
fn test_mapping_loaded_from_vocabulary_files() {
    let fixture = CdmFixture::new();
    fixture
        .write_named(
            "concept",
            "part0001.parquet",
            &[concept(&[(2001, "Ingredient"), (1001, "Clinical Drug")])],
        )
        .write_named(
            "concept",
            "part0002.parquet",
            &[concept(&[(2002, "Ingredient"), (3000, "Brand Name")])],
        )
        .write_named(
            "concept_ancestor",
            "part0001.parquet",
            &[concept_ancestor(&[
                (2002, 1001),
                (2001, 1001),
                // Ancestor is not an ingredient
                (3000, 1001),
                (2001, 2001),
            ])],
        );

    let mapping = DrugIngredientMapping::load(&fixture.cdm_path()).unwrap();

    assert_eq!(mapping.ingredients_of(1001), &[2002, 2001]);
    assert_eq!(mapping.ingredients_of(2001), &[2001]);
    assert!(mapping.ingredients_of(3000).is_empty());
    assert_eq!(mapping.len(), 2);
}

#[test]
fn test_missing_vocabulary_is_error() {
    let fixture = CdmFixture::new();
    assert!(DrugIngredientMapping::load(&fixture.cdm_path()).is_err());
}
