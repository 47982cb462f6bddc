use std::path::Path;

use job_intake::config::AppConfig;
use job_intake::job_acquisition::SiteRules;

#[test]
fn shipped_table_loads_from_disk() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/site_rules.yaml");
    let rules = SiteRules::from_file(&path).unwrap();

    assert_eq!(rules.site_names(), SiteRules::embedded().unwrap().site_names());
    assert!(rules.heuristics.keywords.iter().any(|k| k == "experience"));
    assert!(rules.heuristics.keywords.iter().any(|k| k == "poste"));
}

#[test]
fn linkedin_ids_are_extracted_from_both_url_shapes() {
    let rules = SiteRules::embedded().unwrap();
    let linkedin = rules.find("fr.linkedin.com").unwrap();

    assert!(linkedin.has_structured_surface());
    assert_eq!(
        linkedin
            .job_id("https://fr.linkedin.com/jobs/view/rust-developer-at-acme-3987654321")
            .as_deref(),
        Some("3987654321")
    );
    assert_eq!(
        linkedin
            .job_id("https://www.linkedin.com/jobs/collections/recommended/?currentJobId=4012345678")
            .as_deref(),
        Some("4012345678")
    );
}

#[test]
fn config_override_path_is_honoured() {
    let mut config = AppConfig::default();
    config
        .apply_env(|key| {
            (key == "SITE_RULES_PATH")
                .then(|| concat!(env!("CARGO_MANIFEST_DIR"), "/config/site_rules.yaml").to_string())
        })
        .unwrap();

    let rules = config.site_rules().unwrap();
    assert!(rules.find("www.indeed.fr").is_some());
}
