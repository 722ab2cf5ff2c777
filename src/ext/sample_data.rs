// Small fixed set of movies used by the demo binary to seed a table.
// ---------------------------------------------------------------------------

use fractic_core::collection;

use crate::schema::{
    movie::{INFO_PLOT, INFO_RATING},
    InfoValue, Movie,
};

fn movie(title: &str, year: i64, plot: &str, rating: InfoValue) -> Movie {
    Movie::new(
        title,
        year,
        collection! {
            INFO_PLOT.to_string() => InfoValue::String(plot.to_string()),
            INFO_RATING.to_string() => rating,
        },
    )
}

pub fn sample_movies() -> Vec<Movie> {
    vec![
        movie(
            "Akira",
            1988,
            "cool kids riding cool bikes turned pk",
            InfoValue::Integer(5),
        ),
        movie("Barbie", 2023, "She's barbie", InfoValue::Integer(3)),
        movie(
            "Star Wars",
            1986,
            "Geoge Lucas magnum opus",
            InfoValue::Integer(5),
        ),
        movie(
            "Scarface",
            1983,
            "Say hello to my little friend",
            InfoValue::Integer(3),
        ),
        movie(
            "Suicide Squad (2021)",
            2021,
            "James Gunn redemeed this saga",
            InfoValue::Integer(4),
        ),
        movie(
            "Super Mario Bros",
            2023,
            "Movie based on the Super Mario Bros game of Nintendo",
            InfoValue::Float(2.5),
        ),
    ]
}
