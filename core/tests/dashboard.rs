//! Dashboard view tests over the default 500-member session.

use attendance_core::{
    config::{FloatRange, NormalParams},
    dashboard::{ChurnFlag, Dashboard, SURVIVAL_MONTHS},
    generate, GeneratorConfig, Population, PopulationGenerator, RfmSegment, Thresholds,
};

// ── Helpers ──────────────────────────────────────────────────────────────────

fn population() -> Population {
    let _ = env_logger::builder().is_test(true).try_init();
    generate(500, 42).expect("generate")
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[test]
fn frequency_tiers_are_nested() {
    let pop = population();
    let tiers = Dashboard::new(&pop).frequency_tiers();

    assert_eq!(tiers.total, 500);
    assert!(tiers.eight_plus <= tiers.four_plus);
    assert!(tiers.four_plus <= tiers.one_plus);
    assert_eq!(tiers.zero_visits, tiers.total - tiers.one_plus);
    // Sampled frequency starts at 1.
    assert_eq!(tiers.one_plus, 500);
    assert_eq!(tiers.zero_visits, 0);
}

#[test]
fn kpi_deltas_stay_in_their_ranges_and_repeat() {
    let pop = population();
    let dash = Dashboard::new(&pop);
    let d = dash.kpi_deltas();
    assert!((-10..10).contains(&d.eight_plus));
    assert!((-15..15).contains(&d.four_plus));
    assert!((-5..0).contains(&d.zero_visits));
    assert_eq!(d, dash.kpi_deltas());
}

#[test]
fn anomalies_follow_the_slider_not_the_reason_cutoff() {
    let pop = population();
    let dash = Dashboard::new(&pop);

    let strict = dash.anomalies(-3.0);
    let loose = dash.anomalies(-1.0);
    assert!(strict.len() <= loose.len());
    assert!(strict.iter().all(|m| m.z_score <= -3.0));

    // z in (-1.5, -1.0] is flagged by the slider but has no reason.
    let between: Vec<_> = loose.iter().filter(|m| m.z_score > -1.5).collect();
    assert!(!between.is_empty(), "Expected members between the two cutoffs");
    assert!(between.iter().all(|m| m.reason_category.is_none()));
}

#[test]
fn reason_counts_cover_the_filtered_subset() {
    let pop = population();
    let dash = Dashboard::new(&pop);

    let counts = dash.reason_counts(-2.0);
    let total: usize = counts.iter().map(|c| c.count).sum();
    let expected = dash
        .anomalies(-2.0)
        .iter()
        .filter(|m| m.reason_category.is_some())
        .count();
    assert_eq!(total, expected);
    assert!(counts.windows(2).all(|w| w[0].count >= w[1].count), "Counts must be descending");
}

#[test]
fn dead_cross_list_is_sorted_by_short_average() {
    let pop = population();
    let list = Dashboard::new(&pop).dead_cross_members();
    assert!(!list.is_empty());
    assert!(list.iter().all(|m| m.dead_cross));
    assert!(list.windows(2).all(|w| w[0].ma_short <= w[1].ma_short));
}

#[test]
fn segment_counts_partition_the_population() {
    let pop = population();
    let counts = Dashboard::new(&pop).segment_counts();
    assert_eq!(counts.len(), RfmSegment::ALL.len());
    assert_eq!(counts.iter().map(|c| c.count).sum::<usize>(), 500);
}

#[test]
fn high_churn_risk_sorted_descending() {
    let pop = population();
    let list = Dashboard::new(&pop).high_churn_risk(0.7);
    assert!(!list.is_empty());
    assert!(list.iter().all(|m| m.churn_prob >= 0.7));
    assert!(list.windows(2).all(|w| w[0].churn_prob >= w[1].churn_prob));
}

#[test]
fn survival_curve_declines_within_noise() {
    let pop = population();
    let curve = Dashboard::new(&pop).survival_curve();
    assert_eq!(curve.len(), SURVIVAL_MONTHS as usize);
    for (i, p) in curve.iter().enumerate() {
        assert_eq!(p.month as usize, i + 1);
        let base = 100.0 - 3.0 * i as f64;
        assert!(
            p.survival_rate <= base && p.survival_rate > base - 5.0,
            "month {} rate {} outside ({}, {}]",
            p.month, p.survival_rate, base - 5.0, base
        );
    }
}

#[test]
fn watchlist_is_union_of_risk_subsets() {
    let pop = population();
    let dash = Dashboard::new(&pop);
    let t = Thresholds::default();

    let watch = dash.watchlist(&t);
    for m in pop.members() {
        let flagged = m.z_score <= t.z_threshold || m.churn_prob >= t.churn_threshold;
        assert_eq!(watch.contains(&m.name.as_str()), flagged, "{}", m.name);
    }
}

#[test]
fn watchlist_falls_back_to_everyone() {
    // A one-member table outside both risk subsets at the strictest
    // slider settings.
    let t = Thresholds::new(-5.0, 0.9).unwrap();
    let pop = (0..100)
        .map(|seed| generate(1, seed).unwrap())
        .find(|p| {
            let m = &p.members()[0];
            m.z_score > t.z_threshold && m.churn_prob < t.churn_threshold
        })
        .expect("some seed below 100 yields an unflagged member");
    let m = &pop.members()[0];
    let dash = Dashboard::new(&pop);
    assert!(dash.anomalies(t.z_threshold).is_empty());
    assert!(dash.high_churn_risk(t.churn_threshold).is_empty());

    assert_eq!(dash.watchlist(&t), vec![m.name.as_str()]);

    let d = dash.select(Some("Nobody"), &t).unwrap();
    assert!(d.fell_back);
    assert_eq!(d.name, m.name);
}

#[test]
fn unknown_member_falls_back_to_first_member_when_nobody_is_flagged() {
    // Narrow z spread and churn capped below 0.5: no member can reach
    // either slider at any allowed setting.
    let config = GeneratorConfig {
        z_score: NormalParams { mean: 0.0, std_dev: 0.1 },
        churn_prob: FloatRange { lo: 0.0, hi: 0.4 },
        ..GeneratorConfig::default()
    };
    let pop = PopulationGenerator::new(config).unwrap().generate(500, 42).unwrap();
    let dash = Dashboard::new(&pop);
    let t = Thresholds::default();
    assert!(dash.anomalies(t.z_threshold).is_empty());
    assert!(dash.high_churn_risk(t.churn_threshold).is_empty());
    assert_eq!(dash.watchlist(&t).len(), 500);

    let d = dash.select(Some("Nobody"), &t).unwrap();
    assert!(d.fell_back);
    assert_eq!(d.name, "Member_1");
}

#[test]
fn select_known_member() {
    let pop = population();
    let dash = Dashboard::new(&pop);
    let t = Thresholds::default();
    let d = dash.select(Some("Member_17"), &t).unwrap();
    let m = pop.get_by_name("Member_17").unwrap();

    assert!(!d.fell_back);
    assert_eq!(d.name, "Member_17");
    assert_eq!(d.reason_category, m.reason_category);
    assert_eq!(d.reason_detail, m.reason_detail);
    let expected = if m.churn_prob > t.churn_threshold {
        ChurnFlag::AtRisk
    } else {
        ChurnFlag::Safe
    };
    assert_eq!(d.churn_flag, expected);
}

#[test]
fn select_unknown_member_falls_back_to_watchlist_head() {
    let pop = population();
    let dash = Dashboard::new(&pop);
    let t = Thresholds::default();

    let d = dash.select(Some("Nobody"), &t).unwrap();
    assert!(d.fell_back);
    assert_eq!(d.name, dash.watchlist(&t)[0]);

    let none = dash.select(None, &t).unwrap();
    assert!(!none.fell_back);
    assert_eq!(none.name, d.name);
}

#[test]
fn state_reflects_thresholds() {
    let pop = population();
    let dash = Dashboard::new(&pop);
    let t = Thresholds::new(-2.5, 0.8).unwrap();

    let state = dash.state(t, None).unwrap();
    assert_eq!(state.thresholds, t);
    assert_eq!(state.anomalies.len(), dash.anomalies(-2.5).len());
    assert_eq!(state.high_churn_risk.len(), dash.high_churn_risk(0.8).len());

    let json = serde_json::to_value(&state).unwrap();
    assert_eq!(json["tiers"]["total"], 500);
    assert!(json["selected"]["name"].is_string());
}

#[test]
fn views_do_not_touch_the_table() {
    let pop = population();
    let before = pop.clone();
    let dash = Dashboard::new(&pop);
    for z in [-5.0, -3.0, -2.0, -1.0] {
        let _ = dash.state(Thresholds::new(z, 0.6).unwrap(), Some("Member_1")).unwrap();
    }
    assert_eq!(pop, before);
}
