// trip search over a snapshot of all trips

use std::collections::BTreeSet;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Offset, TimeZone, Utc};

use crate::models::{SearchCriteria, SearchResult, Trip};

/// Matches search criteria against a trip snapshot.
///
/// Calendar dates are read in a single fixed offset: a departure matches a
/// requested day when it falls on that day in this offset, and the fallback
/// distance is measured from midnight of the requested day in this offset.
#[derive(Debug, Clone, Copy)]
pub struct TripMatcher {
    offset: FixedOffset,
}

impl Default for TripMatcher {
    fn default() -> Self {
        Self::new(Utc.fix())
    }
}

impl TripMatcher {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Exact matches if there are any, otherwise the nearest-date trip on the
    /// same route. The fallback ignores seat availability.
    pub fn find_matches(&self, criteria: &SearchCriteria, trips: &[Trip]) -> SearchResult {
        let exact: Vec<Trip> = trips
            .iter()
            .filter(|trip| self.is_exact_match(trip, criteria))
            .cloned()
            .collect();

        if !exact.is_empty() {
            return SearchResult::Matches { trips: exact };
        }

        let reference = self.start_of_day(criteria.requested_date);

        // min_by_key keeps the first of equal keys
        let closest = trips
            .iter()
            .filter(|trip| !trip.is_cancelled && on_route(trip, criteria))
            .min_by_key(|trip| (trip.departure_date - reference).abs());

        match closest {
            Some(trip) => SearchResult::Closest {
                seats_sufficient: trip.has_seats_for(criteria.seat_count),
                trip: trip.clone(),
            },
            None => SearchResult::NoRoute,
        }
    }

    pub fn departure_day(&self, trip: &Trip) -> NaiveDate {
        trip.departure_date.with_timezone(&self.offset).date_naive()
    }

    fn is_exact_match(&self, trip: &Trip, criteria: &SearchCriteria) -> bool {
        !trip.is_cancelled
            && on_route(trip, criteria)
            && self.departure_day(trip) == criteria.requested_date
            && trip.has_seats_for(criteria.seat_count)
    }

    fn start_of_day(&self, date: NaiveDate) -> DateTime<Utc> {
        let midnight = date.and_time(NaiveTime::MIN);
        match self.offset.from_local_datetime(&midnight).single() {
            Some(local) => local.with_timezone(&Utc),
            None => Utc.from_utc_datetime(&midnight),
        }
    }
}

fn on_route(trip: &Trip, criteria: &SearchCriteria) -> bool {
    trip.origin == criteria.origin && trip.destination == criteria.destination
}

// every region that appears as an origin or a destination, sorted
pub fn available_regions(trips: &[Trip]) -> Vec<String> {
    trips
        .iter()
        .flat_map(|trip| [trip.origin.as_str(), trip.destination.as_str()])
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

// a company's live trips; trips carry the managing account's username as company name
pub fn company_trips(trips: &[Trip], company_name: &str) -> Vec<Trip> {
    trips
        .iter()
        .filter(|trip| trip.company_name == company_name && !trip.is_cancelled)
        .cloned()
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn trip(id: u64, origin: &str, destination: &str, departure: &str, seats: u32) -> Trip {
        Trip {
            id,
            origin: origin.to_string(),
            destination: destination.to_string(),
            departure_date: departure.parse().unwrap(),
            available_seats: seats,
            total_seats: 40,
            price: 15000.0,
            company_name: "Al-Qadmous".to_string(),
            is_cancelled: false,
        }
    }

    fn criteria(origin: &str, destination: &str, date: (i32, u32, u32), seats: u32) -> SearchCriteria {
        SearchCriteria {
            origin: origin.to_string(),
            destination: destination.to_string(),
            requested_date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            seat_count: seats,
        }
    }

    fn find_matches(criteria: &SearchCriteria, trips: &[Trip]) -> SearchResult {
        TripMatcher::default().find_matches(criteria, trips)
    }

    fn damascus_aleppo() -> Vec<Trip> {
        vec![
            trip(1, "Damascus", "Aleppo", "2024-05-01T00:00:00Z", 4),
            trip(2, "Damascus", "Aleppo", "2024-05-03T00:00:00Z", 2),
        ]
    }

    #[test]
    fn test_exact_matches_keep_snapshot_order() {
        let trips = vec![
            trip(1, "Damascus", "Aleppo", "2024-05-01T18:00:00Z", 4),
            trip(2, "Damascus", "Homs", "2024-05-01T09:00:00Z", 10),
            trip(3, "Damascus", "Aleppo", "2024-05-01T07:00:00Z", 1),
            trip(4, "Damascus", "Aleppo", "2024-05-02T07:00:00Z", 9),
        ];

        let result = find_matches(&criteria("Damascus", "Aleppo", (2024, 5, 1), 1), &trips);

        let ids: Vec<u64> = result.matches().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert!(result.closest().is_none());
    }

    #[test]
    fn test_every_exact_match_satisfies_all_conditions() {
        let trips = vec![
            trip(1, "Damascus", "Aleppo", "2024-05-01T10:00:00Z", 4),
            trip(2, "damascus", "Aleppo", "2024-05-01T10:00:00Z", 4),
            trip(3, "Damascus", "Aleppo", "2024-05-01T10:00:00Z", 1),
            trip(4, "Damascus", "Aleppo ", "2024-05-01T10:00:00Z", 4),
        ];
        let wanted = criteria("Damascus", "Aleppo", (2024, 5, 1), 2);

        let result = find_matches(&wanted, &trips);

        assert_eq!(result.matches().len(), 1);
        for t in result.matches() {
            assert_eq!(t.origin, wanted.origin);
            assert_eq!(t.destination, wanted.destination);
            assert_eq!(t.departure_date.date_naive(), wanted.requested_date);
            assert!(t.available_seats >= wanted.seat_count);
        }
    }

    #[test]
    fn test_fallback_tie_goes_to_first_in_snapshot() {
        let result = find_matches(&criteria("Damascus", "Aleppo", (2024, 5, 2), 1), &damascus_aleppo());

        assert!(result.matches().is_empty());
        assert_eq!(result.closest().map(|t| t.id), Some(1));

        let mut reversed = damascus_aleppo();
        reversed.reverse();
        let result = find_matches(&criteria("Damascus", "Aleppo", (2024, 5, 2), 1), &reversed);
        assert_eq!(result.closest().map(|t| t.id), Some(2));
    }

    #[test]
    fn test_fallback_ignores_seat_availability() {
        let result = find_matches(&criteria("Damascus", "Aleppo", (2024, 5, 1), 5), &damascus_aleppo());

        assert_eq!(
            result,
            SearchResult::Closest {
                trip: damascus_aleppo()[0].clone(),
                seats_sufficient: false,
            }
        );
    }

    #[test]
    fn test_fallback_picks_minimum_distance() {
        let trips = vec![
            trip(1, "Damascus", "Aleppo", "2024-04-20T08:00:00Z", 30),
            trip(2, "Damascus", "Aleppo", "2024-05-09T08:00:00Z", 30),
            trip(3, "Damascus", "Aleppo", "2024-05-06T23:00:00Z", 30),
            trip(4, "Homs", "Aleppo", "2024-05-05T01:00:00Z", 30),
        ];

        let result = find_matches(&criteria("Damascus", "Aleppo", (2024, 5, 5), 1), &trips);

        assert_eq!(result.closest().map(|t| t.id), Some(3));
        assert_eq!(
            result,
            SearchResult::Closest { trip: trips[2].clone(), seats_sufficient: true }
        );
    }

    #[test]
    fn test_no_route_when_nothing_shares_it() {
        let trips = vec![
            trip(1, "Aleppo", "Damascus", "2024-05-01T00:00:00Z", 4),
            trip(2, "Damascus", "Latakia", "2024-05-02T00:00:00Z", 4),
        ];

        let result = find_matches(&criteria("Damascus", "Aleppo", (2024, 5, 2), 1), &trips);
        assert_eq!(result, SearchResult::NoRoute);

        let result = find_matches(&criteria("Damascus", "Aleppo", (2024, 5, 2), 1), &[]);
        assert_eq!(result, SearchResult::NoRoute);
    }

    #[test]
    fn test_cancelled_trips_are_never_suggested() {
        let mut trips = damascus_aleppo();
        trips[0].is_cancelled = true;

        let result = find_matches(&criteria("Damascus", "Aleppo", (2024, 5, 1), 1), &trips);
        assert_eq!(result.closest().map(|t| t.id), Some(2));

        trips[1].is_cancelled = true;
        let result = find_matches(&criteria("Damascus", "Aleppo", (2024, 5, 1), 1), &trips);
        assert_eq!(result, SearchResult::NoRoute);
    }

    #[test]
    fn test_offset_moves_the_calendar_day() {
        // 22:30 UTC on the 1st is already the 2nd in Damascus
        let trips = vec![trip(1, "Damascus", "Aleppo", "2024-05-01T22:30:00Z", 4)];
        let wanted = criteria("Damascus", "Aleppo", (2024, 5, 2), 1);

        assert_eq!(find_matches(&wanted, &trips).matches().len(), 0);

        let damascus = TripMatcher::new(FixedOffset::east_opt(3 * 3600).unwrap());
        assert_eq!(damascus.find_matches(&wanted, &trips).matches().len(), 1);
    }

    #[test]
    fn test_search_is_idempotent() {
        let trips = damascus_aleppo();
        let wanted = criteria("Damascus", "Aleppo", (2024, 5, 2), 1);
        assert_eq!(find_matches(&wanted, &trips), find_matches(&wanted, &trips));
    }

    #[test]
    fn test_available_regions_sorted_and_unique() {
        let trips = vec![
            trip(1, "Homs", "Aleppo", "2024-05-01T00:00:00Z", 4),
            trip(2, "Damascus", "Homs", "2024-05-01T00:00:00Z", 4),
        ];
        assert_eq!(available_regions(&trips), vec!["Aleppo", "Damascus", "Homs"]);
        assert!(available_regions(&[]).is_empty());
    }

    #[test]
    fn test_company_trips_skip_other_companies_and_cancelled() {
        let mut cancelled = trip(3, "Homs", "Tartus", "2024-05-02T00:00:00Z", 4);
        cancelled.company_name = "qadmous".to_string();
        cancelled.is_cancelled = true;

        let mut own = trip(1, "Homs", "Aleppo", "2024-05-01T00:00:00Z", 4);
        own.company_name = "qadmous".to_string();

        let mut other = trip(2, "Homs", "Aleppo", "2024-05-01T00:00:00Z", 4);
        other.company_name = "kadri".to_string();

        let trips = vec![own, other, cancelled];
        let listed = company_trips(&trips, "qadmous");
        assert_eq!(listed.iter().map(|trip| trip.id).collect::<Vec<_>>(), vec![1]);
        assert!(company_trips(&trips, "Qadmous").is_empty());
    }
}
