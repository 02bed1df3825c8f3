//! Incorporated-city and census-designated-place registries.
//!
//! Each entry is `(place name, authoritative county)`. Lookups are
//! case-insensitive on the full place name.

pub const INCORPORATED_CITIES: &[(&str, &str)] = &[
    // Sacramento region
    ("Sacramento", "Sacramento County"),
    ("Elk Grove", "Sacramento County"),
    ("Citrus Heights", "Sacramento County"),
    ("Folsom", "Sacramento County"),
    ("Rancho Cordova", "Sacramento County"),
    ("Galt", "Sacramento County"),
    ("Isleton", "Sacramento County"),
    ("Davis", "Yolo County"),
    ("Woodland", "Yolo County"),
    ("West Sacramento", "Yolo County"),
    ("Roseville", "Placer County"),
    ("Rocklin", "Placer County"),
    ("Auburn", "Placer County"),
    ("Truckee", "Nevada County"),
    ("Nevada City", "Nevada County"),
    // Los Angeles
    ("Los Angeles", "Los Angeles County"),
    ("Long Beach", "Los Angeles County"),
    ("Pasadena", "Los Angeles County"),
    ("Santa Monica", "Los Angeles County"),
    ("Glendale", "Los Angeles County"),
    ("Burbank", "Los Angeles County"),
    ("Torrance", "Los Angeles County"),
    ("Culver City", "Los Angeles County"),
    ("Beverly Hills", "Los Angeles County"),
    ("West Hollywood", "Los Angeles County"),
    ("Inglewood", "Los Angeles County"),
    ("Compton", "Los Angeles County"),
    ("Pomona", "Los Angeles County"),
    // San Diego
    ("San Diego", "San Diego County"),
    ("Chula Vista", "San Diego County"),
    ("Oceanside", "San Diego County"),
    ("Escondido", "San Diego County"),
    ("Carlsbad", "San Diego County"),
    ("El Cajon", "San Diego County"),
    // Bay Area
    ("San Francisco", "San Francisco County"),
    ("Oakland", "Alameda County"),
    ("Berkeley", "Alameda County"),
    ("Fremont", "Alameda County"),
    ("Hayward", "Alameda County"),
    ("Alameda", "Alameda County"),
    ("San Jose", "Santa Clara County"),
    ("Palo Alto", "Santa Clara County"),
    ("Sunnyvale", "Santa Clara County"),
    ("Santa Clara", "Santa Clara County"),
    ("Mountain View", "Santa Clara County"),
    ("Cupertino", "Santa Clara County"),
    ("San Mateo", "San Mateo County"),
    ("Redwood City", "San Mateo County"),
    ("Daly City", "San Mateo County"),
    ("Concord", "Contra Costa County"),
    ("Richmond", "Contra Costa County"),
    ("Walnut Creek", "Contra Costa County"),
    ("Vallejo", "Solano County"),
    ("Fairfield", "Solano County"),
    ("Napa", "Napa County"),
    ("Santa Rosa", "Sonoma County"),
    // Inland Empire and Orange
    ("Riverside", "Riverside County"),
    ("Corona", "Riverside County"),
    ("Moreno Valley", "Riverside County"),
    ("Temecula", "Riverside County"),
    ("Murrieta", "Riverside County"),
    ("Palm Springs", "Riverside County"),
    ("San Bernardino", "San Bernardino County"),
    ("Fontana", "San Bernardino County"),
    ("Ontario", "San Bernardino County"),
    ("Rancho Cucamonga", "San Bernardino County"),
    ("Redlands", "San Bernardino County"),
    ("Anaheim", "Orange County"),
    ("Santa Ana", "Orange County"),
    ("Irvine", "Orange County"),
    ("Huntington Beach", "Orange County"),
    ("Costa Mesa", "Orange County"),
    ("Orange", "Orange County"),
    // Central Valley and coast
    ("Fresno", "Fresno County"),
    ("Clovis", "Fresno County"),
    ("Bakersfield", "Kern County"),
    ("Stockton", "San Joaquin County"),
    ("Lodi", "San Joaquin County"),
    ("Modesto", "Stanislaus County"),
    ("Merced", "Merced County"),
    ("Visalia", "Tulare County"),
    ("Ventura", "Ventura County"),
    ("Oxnard", "Ventura County"),
    ("Thousand Oaks", "Ventura County"),
    ("Santa Barbara", "Santa Barbara County"),
    ("San Luis Obispo", "San Luis Obispo County"),
    ("Salinas", "Monterey County"),
    ("Monterey", "Monterey County"),
    ("Santa Cruz", "Santa Cruz County"),
    // North
    ("Redding", "Shasta County"),
    ("Chico", "Butte County"),
    ("Eureka", "Humboldt County"),
];

pub const CENSUS_DESIGNATED_PLACES: &[(&str, &str)] = &[
    ("Arden-Arcade", "Sacramento County"),
    ("Carmichael", "Sacramento County"),
    ("Fair Oaks", "Sacramento County"),
    ("Orangevale", "Sacramento County"),
    ("Antelope", "Sacramento County"),
    ("North Highlands", "Sacramento County"),
    ("Foothill Farms", "Sacramento County"),
    ("Rio Linda", "Sacramento County"),
    ("Florin", "Sacramento County"),
    ("Vineyard", "Sacramento County"),
    ("Walnut Grove", "Sacramento County"),
    ("East Los Angeles", "Los Angeles County"),
    ("Altadena", "Los Angeles County"),
    ("Hacienda Heights", "Los Angeles County"),
    ("Rowland Heights", "Los Angeles County"),
    ("Florence-Graham", "Los Angeles County"),
    ("Valinda", "Los Angeles County"),
    ("Topanga", "Los Angeles County"),
    ("Spring Valley", "San Diego County"),
    ("Lakeside", "San Diego County"),
    ("Ramona", "San Diego County"),
    ("Alpine", "San Diego County"),
    ("Fallbrook", "San Diego County"),
    ("Castro Valley", "Alameda County"),
    ("Ashland", "Alameda County"),
    ("Alamo", "Contra Costa County"),
    ("Discovery Bay", "Contra Costa County"),
    ("Isla Vista", "Santa Barbara County"),
    ("Montecito", "Santa Barbara County"),
    ("Mead Valley", "Riverside County"),
    ("Home Gardens", "Riverside County"),
    ("Lakeland Village", "Riverside County"),
    ("Ladera Ranch", "Orange County"),
    ("El Dorado Hills", "El Dorado County"),
    ("Granite Bay", "Placer County"),
    ("Aptos", "Santa Cruz County"),
];

fn lookup<'a>(table: &'a [(&'a str, &'a str)], name: &str) -> Option<&'a (&'a str, &'a str)> {
    let n = name.trim();
    table.iter().find(|(place, _)| place.eq_ignore_ascii_case(n))
}

pub fn incorporated_city(name: &str) -> Option<(&'static str, &'static str)> {
    lookup(INCORPORATED_CITIES, name).copied()
}

pub fn is_incorporated_city(name: &str) -> bool {
    incorporated_city(name).is_some()
}

pub fn census_designated_place(name: &str) -> Option<(&'static str, &'static str)> {
    lookup(CENSUS_DESIGNATED_PLACES, name).copied()
}
