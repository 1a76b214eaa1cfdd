use ice_ray_analytics::units::{MHZ, SPEED_OF_LIGHT};
use ice_ray_analytics::*;
use skyangle::SkyAngle;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let medium = MediumProfile::south_pole_simple();
    println!("MEDIUM: {:?}", medium);
    println!(
        "n(0) = {:.3} ; n(-100m) = {:.3} ; n(-1000m) = {:.3}",
        medium.n(0.),
        medium.n(-100.),
        medium.n(-1000.)
    );

    println!("PULSER TO DEEP RECEIVER:");
    let pulser = [0., 0., -200.];
    let receiver = [400., 300., -1000.];
    let rays = new_ray_tracer(medium)
        .log_level(tracing::level_filters::LevelFilter::INFO)
        .build(pulser, receiver);
    print!("{}", rays);
    let frequencies: Vec<f64> = (1..=10).map(|k| 100. * k as f64 * MHZ).collect();
    for i in 0..rays.get_number_of_solutions() {
        let length = rays.get_path_length(i).unwrap_or(std::f64::NAN);
        let time = rays.get_travel_time(i).unwrap_or(std::f64::NAN);
        println!(
            " #{}: L = {:.3}m ; T = {:.3}ns ; effective index: {:.4}",
            i,
            length,
            time,
            time * SPEED_OF_LIGHT / length
        );
        if let (Ok(u), Ok(v)) = (rays.get_launch_vector(i), rays.get_receive_vector(i)) {
            println!("     launch : [{:+.6},{:+.6},{:+.6}]", u[0], u[1], u[2]);
            println!("     receive: [{:+.6},{:+.6},{:+.6}]", v[0], v[1], v[2]);
        }
        if let Ok(attenuation) = rays.get_attenuation(i, &frequencies) {
            frequencies
                .iter()
                .zip(attenuation)
                .for_each(|(f, a)| println!("     {:5.0}MHz: {:.4}", f / MHZ, a));
        }
    }

    println!("RECEIVER RING:");
    let radius = 300.;
    let pairs: Vec<(Vector, Vector)> = (0..12)
        .map(|k| {
            let azimuth = SkyAngle::Degree(30. * k as f64).to_radians();
            let depth = -20. - 15. * k as f64;
            (
                pulser,
                [radius * azimuth.cos(), radius * azimuth.sin(), depth],
            )
        })
        .collect();
    let now = Instant::now();
    let ring = trace_pairs(&pairs, &medium);
    let et = now.elapsed();
    println!(
        "Tracing {} pairs in {}ms ({} solutions)",
        ring.len(),
        et.as_millis(),
        ring.iter()
            .map(|r| r.get_number_of_solutions())
            .sum::<usize>()
    );
    for rays in &ring {
        print!("{}", rays);
        for i in 0..rays.get_number_of_solutions() {
            if let (Ok(t), Ok(l)) = (rays.get_travel_time(i), rays.get_path_length(i)) {
                println!("     T = {:9.3}ns ; L = {:8.3}m", t, l);
            }
        }
    }
}
