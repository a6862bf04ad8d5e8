use super::*;

fn sample() -> NewOffer {
    NewOffer {
        name: "  Detox Chá  ".to_string(),
        tags: vec!["emagrecimento".to_string(), " saúde ".to_string()],
        languages: vec!["Português".to_string()],
        source_url: Some("https://www.facebook.com/ads/library/?id=1".to_string()),
        site_url: Some("   ".to_string()),
        checkout_url: None,
        category: Some("nutra".to_string()),
    }
}

#[test]
fn validated_trims_and_normalizes() {
    let offer = sample().validated().expect("valid offer");
    assert_eq!(offer.name, "Detox Chá");
    assert_eq!(offer.tags, vec!["emagrecimento", "saúde"]);
    assert!(offer.site_url.is_none(), "blank site_url becomes None");
    assert_eq!(offer.category.as_deref(), Some("nutra"));
}

#[test]
fn validated_rejects_blank_name() {
    let mut offer = sample();
    offer.name = "   ".to_string();
    assert!(matches!(offer.validated(), Err(CoreError::Validation(_))));
}

#[test]
fn validated_requires_at_least_one_tag() {
    let mut offer = sample();
    offer.tags.clear();
    let err = offer.validated().unwrap_err();
    assert!(err.to_string().contains("tags"), "got: {err}");
}

#[test]
fn validated_caps_tags_at_ten() {
    let mut offer = sample();
    offer.tags = (0..11).map(|i| format!("tag-{i}")).collect();
    assert!(offer.validated().is_err());

    let mut offer = sample();
    offer.tags = (0..10).map(|i| format!("tag-{i}")).collect();
    assert!(offer.validated().is_ok());
}

#[test]
fn validated_caps_languages_at_four() {
    let mut offer = sample();
    offer.languages = ["Português", "Inglês", "Espanhol", "Francês", "Alemão"]
        .iter()
        .map(ToString::to_string)
        .collect();
    let err = offer.validated().unwrap_err();
    assert!(err.to_string().contains("languages"), "got: {err}");
}

#[test]
fn validated_rejects_duplicate_tags_case_insensitively() {
    let mut offer = sample();
    offer.tags = vec!["Nutra".to_string(), "nutra".to_string()];
    let err = offer.validated().unwrap_err();
    assert!(err.to_string().contains("duplicate"), "got: {err}");
}

#[test]
fn experiment_arm_parses_and_displays() {
    assert_eq!("A".parse::<ExperimentArm>(), Ok(ExperimentArm::A));
    assert_eq!(" b ".parse::<ExperimentArm>(), Ok(ExperimentArm::B));
    assert!(matches!(
        "C".parse::<ExperimentArm>(),
        Err(CoreError::InvalidExperimentArm(_))
    ));
    assert_eq!(ExperimentArm::B.to_string(), "B");
}
