use std::sync::mpsc::channel;
use std::thread;
use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};
use rand::{rngs::OsRng, RngCore};
use xelishash::{v3, Hash};

const HEADER_SIZE: usize = 112;

enum Report {
    Progress(u64),
    Found([u8; HEADER_SIZE], Hash),
}

fn leading_zero_bits(hash: &Hash) -> u32 {
    let mut bits = 0;
    for &byte in hash.as_bytes() {
        if byte == 0 {
            bits += 8;
        } else {
            bits += byte.leading_zeros();
            break;
        }
    }
    bits
}

fn main() {
    let difficulty: u32 = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(16);
    let threads = thread::available_parallelism().map(|n| n.get()).unwrap_or(4);

    println!("mining v3 headers with {threads} threads, difficulty {difficulty} bits");

    let (sender, receiver) = channel();

    thread::scope(|scope| {
        for _ in 0..threads {
            let sender = sender.clone();
            scope.spawn(move || {
                // one private pad per worker
                let mut pad = v3::ScratchPad::default();
                let mut header = [0u8; HEADER_SIZE];
                OsRng.fill_bytes(&mut header);

                let mut counter = 0u64;
                loop {
                    header[..8].copy_from_slice(&counter.to_le_bytes());
                    let hash = v3::hash(&header, &mut pad);

                    if leading_zero_bits(&hash) >= difficulty
                        && sender.send(Report::Found(header, hash)).is_err()
                    {
                        return;
                    }

                    counter += 1;
                    if counter % 32 == 0 && sender.send(Report::Progress(32)).is_err() {
                        return;
                    }
                }
            });
        }
        drop(sender);

        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.green} {pos} hashes [{elapsed_precise}] {msg}")
                .unwrap(),
        );

        let start = Instant::now();
        let mut hashes = 0u64;
        for report in receiver {
            match report {
                Report::Progress(count) => {
                    hashes += count;
                    bar.set_position(hashes);
                    bar.set_message(format!(
                        "{:.2} H/s",
                        hashes as f64 / start.elapsed().as_secs_f64()
                    ));
                }
                Report::Found(header, hash) => {
                    bar.println(format!("{hash} <- {}", hex::encode(header)));
                }
            }
        }
    });
}
