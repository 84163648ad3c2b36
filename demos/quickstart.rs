use astrodate::{civil_to_jd, ConstantDut1, JulianInstant, TimeScale, TimeScaleConverter};
use qtty::Seconds;

fn main() -> astrodate::Result<()> {
    let conv = TimeScaleConverter::builtin().with_earth_orientation(ConstantDut1(Seconds::new(0.08)));

    let now = JulianInstant::now();
    println!("UTC: {now}  (MJD {:.6})", now.mjd());
    for scale in [TimeScale::TAI, TimeScale::TT, TimeScale::TDB, TimeScale::UT1] {
        println!("{scale}: {}", conv.convert(&now, scale)?);
    }
    println!("TAI − UTC: {}", conv.tai_minus_utc(&now)?);

    let launch = civil_to_jd(1957, 10, 4, 19, 26, 24.0, TimeScale::UTC)?;
    let civil = launch.to_civil();
    println!(
        "{}-{:02}-{:02} was a {:?}, day {} of the year, {:.1} days ago",
        civil.year,
        civil.month,
        civil.day,
        civil.weekday(),
        civil.day_of_year(),
        now.diff(&launch).value()
    );
    Ok(())
}
