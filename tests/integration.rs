use astrodate::{
    civil_to_jd, jd_to_civil, CivilDate, ConstantDut1, Error, JulianInstant, LeapSecondStore,
    LeapSecondTable, RefreshPolicy, SourceConfig, TimeScale, TimeScaleConverter,
};
use chrono::{DateTime, Datelike, Timelike, Weekday};
use qtty::{Days, Second, Seconds};

fn utc(year: i32, month: u32, day: i32) -> JulianInstant {
    civil_to_jd(year, month, day, 0, 0, 0.0, TimeScale::UTC).expect("valid date")
}

#[test]
fn civil_to_jd_at_j2000_midnight() {
    let jd = utc(2000, 1, 1);
    assert_eq!(jd.jd(), 2_451_544.5);
    assert_eq!(jd.scale(), TimeScale::UTC);
}

#[test]
fn utc_to_tai_and_tt_reference_vectors() {
    let conv = TimeScaleConverter::builtin();
    let start = JulianInstant::from_jd(2_456_658.5, TimeScale::UTC);

    let tai = conv.to_tai(&start).expect("tai");
    assert!((tai.jd() - 2_456_658.500_405_092_7).abs() < 1e-9);

    let tt = conv.to_tt(&start).expect("tt");
    assert!((tt.jd() - 2_456_658.500_777_592_9).abs() < 1e-9);

    let back = conv.to_utc(&tai).expect("utc");
    assert!((back - start).abs() < Days::new(1e-12));

    // the input is left untouched
    assert_eq!(start.jd(), 2_456_658.5);
    assert_eq!(start.scale(), TimeScale::UTC);
}

#[test]
fn diff_between_2015_and_2017() {
    let a = utc(2015, 1, 1);
    let b = utc(2017, 2, 8);
    assert_eq!(a.diff(&b), Days::new(-769.0));
}

#[test]
fn add_fifteen_days_lands_on_the_23rd() {
    let start = JulianInstant::from_jd(2_457_792.5, TimeScale::UTC);
    let later = start + Days::new(15.0);
    assert_eq!(later.day(), 2_457_807);

    let civil = later.to_civil();
    assert_eq!((civil.year, civil.month, civil.day), (2017, 2, 23));
    assert_eq!(civil.weekday(), Weekday::Thu);
}

#[test]
fn subtract_seconds_across_midnight() {
    let start = JulianInstant::from_jd(2_457_792.5, TimeScale::UTC);
    let earlier = start - Seconds::new(83_829.0);
    let civil = earlier.to_civil();
    assert_eq!((civil.month, civil.day, civil.hour, civil.minute), (2, 7, 0, 42));
    assert!((civil.second - 51.0).abs() < 1e-6);
}

#[test]
fn single_digit_day_round_trips() {
    let civil = jd_to_civil(&utc(2017, 2, 8));
    assert_eq!(civil, CivilDate::ymd(2017, 2, 8));
    assert_eq!(civil.day_of_year(), 39);
    assert!(!civil.is_leap_year());
}

#[test]
fn idempotent_to_utc_from_every_scale() {
    let conv = TimeScaleConverter::builtin().with_earth_orientation(ConstantDut1(Seconds::new(0.2)));
    for scale in TimeScale::ALL {
        let x = JulianInstant::new(2_458_000, 0.318, scale);
        let once = conv.to_utc(&x).expect("to_utc");
        let twice = conv.to_utc(&once).expect("to_utc again");
        assert_eq!(once, twice, "start scale {scale}");
    }
}

#[test]
fn leap_table_lookup_contract() {
    let table = LeapSecondTable::builtin();
    let first = table.entries()[0];
    let last = table.entries()[table.len() - 1];

    assert_eq!(table.lookup(&(first.effective - Seconds::new(1.0))), 0);
    assert_eq!(table.lookup(&first.effective), 10);
    assert_eq!(table.lookup(&last.effective), last.tai_minus_utc);
    assert_eq!(
        table.lookup(&(last.effective + Days::new(3_000.0))),
        last.tai_minus_utc
    );
}

#[test]
fn leap_second_boundary_2017() {
    let conv = TimeScaleConverter::builtin();
    let new_year = utc(2017, 1, 1);
    let last_second = civil_to_jd(2016, 12, 31, 23, 59, 59.0, TimeScale::UTC).expect("valid");

    let dt_before = conv.tai_minus_utc(&last_second).expect("offset");
    let dt_after = conv.tai_minus_utc(&new_year).expect("offset");
    assert_eq!(dt_before, Seconds::new(36.0));
    assert_eq!(dt_after, Seconds::new(37.0));

    // UTC skips a second that TAI counts
    let tai_gap = conv.to_tai(&new_year).expect("tai") - conv.to_tai(&last_second).expect("tai");
    assert!((tai_gap.to::<Second>() - Seconds::new(2.0)).abs() < Seconds::new(1e-6));
}

#[test]
fn tdb_reference_offset() {
    let conv = TimeScaleConverter::builtin();
    let utc = JulianInstant::from_jd(2_456_658.5, TimeScale::UTC);
    let tt = conv.to_tt(&utc).expect("tt");
    let tdb = conv.to_tdb(&utc).expect("tdb");
    let offset = (tdb - tt).to::<Second>();
    assert!(
        (offset - Seconds::new(-7.654e-5)).abs() < Seconds::new(1e-7),
        "TDB − TT = {}",
        offset
    );
}

#[test]
fn chrono_bridge_roundtrip() {
    let conv = TimeScaleConverter::builtin();
    let datetime = DateTime::from_timestamp(1_486_512_000, 250_000_000).expect("2017-02-08");
    let instant = JulianInstant::from_datetime(datetime);
    let tdb = conv.to_tdb(&instant).expect("tdb");
    let back = conv.to_datetime(&tdb).expect("datetime");

    assert_eq!((back.year(), back.month(), back.day()), (2017, 2, 8));
    assert_eq!((back.hour(), back.minute(), back.second()), (0, 0, 0));
    let err_ns = (back - datetime).num_nanoseconds().expect("small");
    assert!(err_ns.abs() < 1_000, "roundtrip error: {} ns", err_ns);
}

#[test]
fn unknown_scale_label_is_rejected() {
    let err = "TCB".parse::<TimeScale>().unwrap_err();
    assert!(matches!(err, Error::UnsupportedScale(ref s) if s == "TCB"));
}

#[test]
fn invalid_civil_input_names_the_field() {
    let err = civil_to_jd(2017, 2, 8, 25, 0, 0.0, TimeScale::UTC).unwrap_err();
    assert!(matches!(err, Error::InvalidDate { field: "hour", .. }));
}

#[test]
fn offline_store_feeds_converter() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = SourceConfig {
        cache_path: Some(dir.path().join("leap-seconds.list")),
        refresh: RefreshPolicy::Offline,
        ..SourceConfig::default()
    };
    let store = LeapSecondStore::new(config);
    let conv = TimeScaleConverter::from_store(&store).expect("offline load");
    assert_eq!(conv.leap_seconds().len(), 28);

    let tai = conv.to_tai(&utc(2014, 1, 1)).expect("tai");
    assert!((tai.jd() - 2_456_658.500_405_092_7).abs() < 1e-9);
}

#[cfg(feature = "serde")]
#[test]
fn serde_roundtrip_keeps_both_parts() {
    let t = JulianInstant::new(2_456_658, 0.500_405_092_592_592_6, TimeScale::TAI);
    let json = serde_json::to_string(&t).expect("serialize");
    let back: JulianInstant = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(back, t);

    let civil = t.to_civil();
    let json = serde_json::to_string(&civil).expect("serialize");
    assert!(json.contains("\"year\":2014"));
}
