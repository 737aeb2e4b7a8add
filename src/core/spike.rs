//! Spike related module.
use itertools::Itertools;
use log;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Exp};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::SNNError;

/// A spike received by a neuron, with its exact (off-grid) emission time.
#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize)]
pub struct SpikeEvent {
    /// The time at which the spike is emitted (ms).
    time: f64,
    /// The weight of the synapse along which the spike is transmitted.
    weight: f64,
    /// The transmission delay (ms).
    delay: f64,
}

impl SpikeEvent {
    /// Create a new spike event.
    /// The function returns an error for non-finite time or weight and for negative delay.
    pub fn new(time: f64, weight: f64, delay: f64) -> Result<Self, SNNError> {
        if !time.is_finite() {
            return Err(SNNError::InvalidParameter(format!(
                "Spike time must be finite, got {}",
                time
            )));
        }
        if !weight.is_finite() {
            return Err(SNNError::InvalidParameter(format!(
                "Spike weight must be finite, got {}",
                weight
            )));
        }
        if !(delay.is_finite() && delay >= 0.0) {
            return Err(SNNError::InvalidParameter(format!(
                "Spike delay must be non-negative, got {}",
                delay
            )));
        }
        Ok(SpikeEvent {
            time,
            weight,
            delay,
        })
    }

    /// Returns the emission time of the spike.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Returns the weight of the spike.
    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Returns the transmission delay of the spike.
    pub fn delay(&self) -> f64 {
        self.delay
    }

    /// Returns the time at which the spike reaches the neuron.
    pub fn effective_time(&self) -> f64 {
        self.time + self.delay
    }
}

/// A sequence of spike events sorted by effective arrival time.
#[derive(Debug, PartialEq, Clone, Default, Serialize)]
pub struct SpikeTrain {
    events: Vec<SpikeEvent>,
}

impl<'de> Deserialize<'de> for SpikeTrain {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct SpikeTrainData {
            events: Vec<SpikeEvent>,
        }

        let data = SpikeTrainData::deserialize(deserializer)?;
        SpikeTrain::build(data.events).map_err(serde::de::Error::custom)
    }
}

impl SpikeTrain {
    /// Returns a new empty spike train.
    pub fn new_empty() -> Self {
        SpikeTrain { events: vec![] }
    }

    /// Create a spike train from the provided events.
    /// If necessary, the events are sorted by effective time (the relative order of simultaneous events is preserved).
    /// The function returns an error for invalid events.
    pub fn build(mut events: Vec<SpikeEvent>) -> Result<Self, SNNError> {
        for event in events.iter() {
            SpikeEvent::new(event.time, event.weight, event.delay)?;
        }
        events.sort_by(|event_1, event_2| {
            event_1
                .effective_time()
                .total_cmp(&event_2.effective_time())
        });
        Ok(SpikeTrain { events })
    }

    /// Create a spike train from emission times sharing a common weight and delay.
    pub fn from_times(times: &[f64], weight: f64, delay: f64) -> Result<Self, SNNError> {
        let events = times
            .iter()
            .map(|time| SpikeEvent::new(*time, weight, delay))
            .collect::<Result<Vec<SpikeEvent>, SNNError>>()?;
        SpikeTrain::build(events)
    }

    /// Returns the slice of (sorted) spike events.
    pub fn events(&self) -> &[SpikeEvent] {
        &self.events[..]
    }

    /// An iterator over the spike events.
    pub fn iter(&self) -> impl Iterator<Item = &SpikeEvent> + '_ {
        self.events.iter()
    }

    /// An iterator over the effective times of the spike events.
    pub fn effective_times(&self) -> impl Iterator<Item = f64> + '_ {
        self.events.iter().map(|event| event.effective_time())
    }

    /// Returns the number of spike events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns true if the spike train has no events.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Returns the number of events which reached the neuron at or before the provided time.
    pub fn causal_len(&self, time: f64) -> usize {
        self.events
            .partition_point(|event| event.effective_time() <= time)
    }

    /// Save the spike train to a file.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<(), SNNError> {
        let file = File::create(path).map_err(|e| SNNError::IOError(e.to_string()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)
            .map_err(|e| SNNError::IOError(e.to_string()))?;
        writer.flush().map_err(|e| SNNError::IOError(e.to_string()))
    }

    /// Load a spike train from a file.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, SNNError> {
        let file = File::open(path).map_err(|e| SNNError::IOError(e.to_string()))?;
        let reader = BufReader::new(file);
        serde_json::from_reader(reader).map_err(|e| SNNError::IOError(e.to_string()))
    }
}

/// A Poisson point process with dead time, producing exact (off-grid) spike times.
/// The inter-spike intervals are dead_time + Exp(rate / (1 - rate * dead_time)), which keeps the mean rate.
#[derive(Debug, Clone)]
pub struct PoissonProcess {
    /// The mean rate (1/ms).
    rate: f64,
    /// The dead time after each spike (ms).
    dead_time: f64,
    /// The exponential part of the inter-spike intervals, if the rate is positive.
    exp: Option<Exp<f64>>,
    /// The next spike time, once the process has been started.
    next: Option<f64>,
}

impl PoissonProcess {
    /// Create a new Poisson process with the given rate (Hz) and dead time (ms).
    /// The function returns an error for negative rate or dead time, and if the dead time does not fit in the mean interval.
    pub fn build(rate: f64, dead_time: f64) -> Result<Self, SNNError> {
        if !(rate.is_finite() && rate >= 0.0) {
            return Err(SNNError::InvalidParameter(format!(
                "Poisson rate must be non-negative, got {}",
                rate
            )));
        }
        if !(dead_time.is_finite() && dead_time >= 0.0) {
            return Err(SNNError::InvalidParameter(format!(
                "Poisson dead time must be non-negative, got {}",
                dead_time
            )));
        }

        // Rates are given in Hz, times in ms
        let rate = rate / 1000.0;
        if rate * dead_time >= 1.0 {
            return Err(SNNError::InvalidParameter(
                "The inverse rate must be larger than the dead time".to_string(),
            ));
        }

        let exp = match rate > 0.0 {
            true => Some(
                Exp::new(rate / (1.0 - rate * dead_time))
                    .map_err(|e| SNNError::InvalidParameter(e.to_string()))?,
            ),
            false => None,
        };

        Ok(PoissonProcess {
            rate,
            dead_time,
            exp,
            next: None,
        })
    }

    /// Returns the spike times in (start, end].
    /// The process is started at the first call, the first spike being drawn from the stationary forward recurrence time.
    /// Subsequent calls must cover contiguous, increasing intervals.
    pub fn advance<R: Rng>(&mut self, start: f64, end: f64, rng: &mut R) -> Vec<f64> {
        let exp = match self.exp {
            Some(exp) => exp,
            None => return vec![],
        };

        let mut next = match self.next {
            Some(next) => next,
            None => {
                // With probability rate * dead_time, the process is within a dead time at the origin
                let u: f64 = rng.gen();
                if u < self.rate * self.dead_time {
                    start + rng.gen_range(0.0..self.dead_time)
                } else {
                    start + self.dead_time + exp.sample(rng)
                }
            }
        };

        let mut times = vec![];
        while next <= end {
            if next > start {
                times.push(next);
            }
            next += self.dead_time + exp.sample(rng);
        }
        self.next = Some(next);
        times
    }
}

/// Returns a random Poisson spike train in (start, stop] with the given rate (Hz) and dead time (ms).
pub fn rand_poisson(
    rate: f64,
    start: f64,
    stop: f64,
    dead_time: f64,
    seed: u64,
) -> Result<Vec<f64>, SNNError> {
    if !(start.is_finite() && stop.is_finite()) || start > stop {
        return Err(SNNError::InvalidParameter(format!(
            "Invalid time range: ({}, {}]",
            start, stop
        )));
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut process = PoissonProcess::build(rate, dead_time)?;
    let times = process.advance(start, stop, &mut rng);

    log::trace!(
        "{} spikes sampled in ({}, {}] (expected number of spikes is {})",
        times.len(),
        start,
        stop,
        rate / 1000.0 * (stop - start)
    );

    Ok(times)
}

/// Returns true if the times are sorted and at least min_interval apart.
pub fn is_separated(times: &[f64], min_interval: f64) -> bool {
    times
        .iter()
        .tuple_windows()
        .all(|(t1, t2)| t2 - t1 >= min_interval)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const SEED: u64 = 42;

    #[test]
    fn test_spike_event_new() {
        let event = SpikeEvent::new(0.5, 65.0, 1.0).unwrap();
        assert_eq!(event.time(), 0.5);
        assert_eq!(event.weight(), 65.0);
        assert_eq!(event.delay(), 1.0);
        assert_eq!(event.effective_time(), 1.5);

        assert!(matches!(
            SpikeEvent::new(f64::NAN, 1.0, 1.0),
            Err(SNNError::InvalidParameter(_))
        ));
        assert!(matches!(
            SpikeEvent::new(0.0, f64::INFINITY, 1.0),
            Err(SNNError::InvalidParameter(_))
        ));
        assert!(matches!(
            SpikeEvent::new(0.0, 1.0, -0.1),
            Err(SNNError::InvalidParameter(_))
        ));
        assert!(SpikeEvent::new(0.0, 1.0, 0.0).is_ok());
    }

    #[test]
    fn test_spike_train_build() {
        // Events are sorted by effective time, not by emission time
        let spike_train = SpikeTrain::build(vec![
            SpikeEvent::new(1.0, 1.0, 0.0).unwrap(),
            SpikeEvent::new(0.0, 2.0, 2.0).unwrap(),
            SpikeEvent::new(0.5, 3.0, 0.0).unwrap(),
        ])
        .unwrap();
        assert_eq!(
            spike_train.effective_times().collect::<Vec<f64>>(),
            vec![0.5, 1.0, 2.0]
        );
        assert_eq!(
            spike_train
                .iter()
                .map(|event| event.weight())
                .collect::<Vec<f64>>(),
            vec![3.0, 1.0, 2.0]
        );

        // Simultaneous events keep their order
        let spike_train = SpikeTrain::build(vec![
            SpikeEvent::new(1.0, 1.0, 0.0).unwrap(),
            SpikeEvent::new(0.0, 2.0, 1.0).unwrap(),
        ])
        .unwrap();
        assert_eq!(spike_train.events()[0].weight(), 1.0);
        assert_eq!(spike_train.events()[1].weight(), 2.0);

        let spike_train = SpikeTrain::from_times(&[], 1.0, 1.0).unwrap();
        assert!(spike_train.is_empty());
        assert_eq!(spike_train, SpikeTrain::new_empty());

        assert!(SpikeTrain::from_times(&[0.0, f64::NAN], 1.0, 1.0).is_err());
        assert!(SpikeTrain::from_times(&[0.0], 1.0, -1.0).is_err());
    }

    #[test]
    fn test_spike_train_causal_len() {
        let spike_train = SpikeTrain::from_times(&[0.5, 1.5, 3.0], 1.0, 0.0).unwrap();
        assert_eq!(spike_train.causal_len(0.0), 0);
        assert_eq!(spike_train.causal_len(0.5), 1);
        assert_eq!(spike_train.causal_len(2.0), 2);
        assert_eq!(spike_train.causal_len(6.0), 3);
    }

    #[test]
    fn test_spike_train_save_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("spike_train.json");

        let spike_train = SpikeTrain::from_times(&[0.125, 3.0, 1.75], 65.0, 1.0).unwrap();
        spike_train.save_to(&path).unwrap();
        let loaded = SpikeTrain::load_from(&path).unwrap();
        assert_eq!(loaded, spike_train);

        assert!(matches!(
            SpikeTrain::load_from(dir.path().join("missing.json")),
            Err(SNNError::IOError(_))
        ));
    }

    #[test]
    fn test_spike_train_load_invalid() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("spike_train.json");
        std::fs::write(
            &path,
            r#"{"events": [{"time": 1.0, "weight": 1.0, "delay": -1.0}]}"#,
        )
        .unwrap();
        assert!(matches!(
            SpikeTrain::load_from(&path),
            Err(SNNError::IOError(_))
        ));
    }

    #[test]
    fn test_poisson_process_build() {
        assert!(PoissonProcess::build(-1.0, 0.0).is_err());
        assert!(PoissonProcess::build(100.0, -1.0).is_err());
        // 1 kHz with 1 ms dead time leaves no room for the exponential part
        assert!(PoissonProcess::build(1000.0, 1.0).is_err());
        assert!(PoissonProcess::build(500.0, 1.0).is_ok());
        assert!(PoissonProcess::build(0.0, 0.0).is_ok());
    }

    #[test]
    fn test_rand_poisson() {
        // Always in the window and sorted
        let times = rand_poisson(16000.0, 0.0, 100.0, 0.0, SEED).unwrap();
        assert!(times.iter().all(|&t| t > 0.0 && t <= 100.0));
        assert!(is_separated(&times, 0.0));

        // 1600 spikes expected, with standard deviation 40
        assert!(times.len() > 1440 && times.len() < 1760);

        // Same seed, same spike train
        assert_eq!(times, rand_poisson(16000.0, 0.0, 100.0, 0.0, SEED).unwrap());
        assert_ne!(times, rand_poisson(16000.0, 0.0, 100.0, 0.0, SEED + 1).unwrap());

        // No spikes without rate
        assert!(rand_poisson(0.0, 0.0, 100.0, 0.0, SEED).unwrap().is_empty());

        assert!(rand_poisson(100.0, 10.0, 0.0, 0.0, SEED).is_err());
    }

    #[test]
    fn test_rand_poisson_dead_time() {
        let times = rand_poisson(200.0, 0.0, 10_000.0, 2.0, SEED).unwrap();
        assert!(is_separated(&times, 2.0));

        // 2000 spikes expected, the dead time makes the count more regular
        assert!(times.len() > 1850 && times.len() < 2150);
    }

    #[test]
    fn test_poisson_process_contiguous() {
        // Sampling a window in chunks yields a valid spike train in every chunk
        let mut rng = ChaCha8Rng::seed_from_u64(SEED);
        let mut process = PoissonProcess::build(1000.0, 0.5).unwrap();
        let mut times = vec![];
        for k in 0..100 {
            let chunk = process.advance(k as f64, (k + 1) as f64, &mut rng);
            assert!(chunk.iter().all(|&t| t > k as f64 && t <= (k + 1) as f64));
            times.extend(chunk);
        }
        assert!(is_separated(&times, 0.5));
        assert!(!times.is_empty());
    }
}
