use roulette_core::{color_of, verify_spin, RouletteRng};

fn main() -> Result<(), roulette_core::RngError> {
    let rng = RouletteRng::new()?;
    for client_seed in [Some("example-client-seed"), None, Some("")] {
        let committed = rng.commitment_hash();
        let res = rng.spin(client_seed)?;
        println!(
            "committed={} number={} color={:?} revealed={} client_seed={} nonce={} verified={}",
            committed,
            res.winning_number,
            color_of(res.winning_number),
            res.server_seed,
            res.client_seed,
            res.nonce,
            verify_spin(&res)
        );
    }
    Ok(())
}
