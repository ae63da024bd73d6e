//! Greedy nearest-neighbour ordering of a day's stops.
//!
//! This is a heuristic that approximates a short tour. It is O(n²), fully
//! deterministic, and makes no optimality claim: the farrier gets a cheap,
//! reproducible order rather than a solved travelling-salesman tour.

use crate::constants::{DEFAULT_CLUSTER_MAX_DISTANCE_KM, DISTANCE_TIE_TOLERANCE_KM};
use crate::models::{Coordinates, Stop};
use std::cmp::Ordering;

struct Candidate {
    original_index: usize,
    coordinates: Coordinates,
    stop: Stop,
}

/// Order `stops` by repeatedly visiting the nearest unvisited geocoded stop.
///
/// The walk starts at `anchor` (the farrier's home) when given, otherwise at
/// the first geocoded stop. Stops without coordinates keep their relative
/// order and go last. Inputs of two stops or fewer are returned unchanged.
///
/// Equidistant candidates (within [`DISTANCE_TIE_TOLERANCE_KM`]) are broken
/// by earlier `scheduled_at`, then by lower input index.
pub fn order_by_proximity(stops: Vec<Stop>, anchor: Option<Coordinates>) -> Vec<Stop> {
    if stops.len() <= 2 {
        return stops;
    }

    let total = stops.len();
    let mut remaining = Vec::with_capacity(total);
    let mut ungeocoded = Vec::new();
    for (original_index, stop) in stops.into_iter().enumerate() {
        match stop.coordinates {
            Some(coordinates) => remaining.push(Candidate {
                original_index,
                coordinates,
                stop,
            }),
            None => ungeocoded.push(stop),
        }
    }

    let mut route = Vec::with_capacity(total);
    let mut current = match anchor {
        Some(home) => Some(home),
        None if remaining.is_empty() => None,
        None => {
            let first = remaining.remove(0);
            route.push(first.stop);
            Some(first.coordinates)
        }
    };

    while let Some(position) = current {
        let Some(best) = nearest_candidate(&remaining, &position) else {
            break;
        };
        let next = remaining.remove(best);
        current = Some(next.coordinates);
        route.push(next.stop);
    }

    route.extend(ungeocoded);
    route
}

fn nearest_candidate(candidates: &[Candidate], from: &Coordinates) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;

    for (i, candidate) in candidates.iter().enumerate() {
        let distance = from.distance_to(&candidate.coordinates);
        let closer = match best {
            None => true,
            Some((best_index, best_distance)) => {
                compare_candidates(candidate, distance, &candidates[best_index], best_distance)
                    == Ordering::Less
            }
        };
        if closer {
            best = Some((i, distance));
        }
    }

    best.map(|(index, _)| index)
}

fn compare_candidates(a: &Candidate, a_km: f64, b: &Candidate, b_km: f64) -> Ordering {
    if (a_km - b_km).abs() > DISTANCE_TIE_TOLERANCE_KM {
        return a_km.total_cmp(&b_km);
    }
    (a.stop.scheduled_at, a.original_index).cmp(&(b.stop.scheduled_at, b.original_index))
}

/// Total length of the consecutive legs whose endpoints are both geocoded.
pub fn route_distance_km(stops: &[Stop]) -> f64 {
    stops
        .windows(2)
        .filter_map(|pair| match (&pair[0].coordinates, &pair[1].coordinates) {
            (Some(from), Some(to)) => Some(from.distance_to(to)),
            _ => None,
        })
        .sum()
}

/// Group stops so that each geocoded stop is within `max_distance_km`
/// (default [`DEFAULT_CLUSTER_MAX_DISTANCE_KM`]) of at least one other stop
/// of its cluster (single linkage). Stops without coordinates each form
/// their own cluster, after the geocoded ones.
pub fn cluster_by_distance(stops: &[Stop], max_distance_km: Option<f64>) -> Vec<Vec<Stop>> {
    let max_distance_km = max_distance_km.unwrap_or(DEFAULT_CLUSTER_MAX_DISTANCE_KM);
    let mut unassigned: Vec<&Stop> = stops.iter().filter(|s| s.is_geocoded()).collect();
    let mut clusters = Vec::new();

    while !unassigned.is_empty() {
        let mut cluster = vec![unassigned.remove(0)];
        let mut frontier = 0;

        while frontier < cluster.len() {
            let Some(origin) = cluster[frontier].coordinates else {
                frontier += 1;
                continue;
            };
            let (near, far): (Vec<&Stop>, Vec<&Stop>) =
                unassigned.into_iter().partition(|candidate| {
                    candidate
                        .coordinates
                        .map(|c| origin.distance_to(&c) <= max_distance_km)
                        .unwrap_or(false)
                });
            cluster.extend(near);
            unassigned = far;
            frontier += 1;
        }

        clusters.push(cluster.into_iter().cloned().collect());
    }

    clusters.extend(
        stops
            .iter()
            .filter(|s| !s.is_geocoded())
            .map(|s| vec![s.clone()]),
    );
    clusters
}
