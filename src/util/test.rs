#[cfg(test)]
mod tests {
    use crate::{
        schema::{
            movie::{INFO_PLOT, INFO_RATING},
            parsing::build_dynamo_map,
            InfoValue, Movie, MovieKey,
        },
        util::{backend::MockDynamoBackend, DynamoUtil, BATCH_WRITE_LIMIT},
    };

    use aws_sdk_dynamodb::{
        error::SdkError,
        operation::{
            batch_write_item::BatchWriteItemOutput, create_table::CreateTableOutput,
            delete_item::DeleteItemOutput, delete_table::DeleteTableOutput,
            get_item::GetItemOutput, list_tables::ListTablesOutput, put_item::PutItemOutput,
            query::QueryOutput, scan::ScanOutput, update_item::UpdateItemOutput,
        },
        types::{AttributeValue, KeyType, PutRequest, ScalarAttributeType, WriteRequest},
    };
    use fractic_core::collection;
    use mockall::predicate::*;
    use mockall::Sequence;
    use std::{collections::HashMap, sync::Arc, time::Duration};

    fn util(backend: MockDynamoBackend) -> DynamoUtil {
        DynamoUtil::with_backend(Arc::new(backend), "movies")
    }

    fn build_movie(title: &str, year: i64, rating: f64) -> Movie {
        Movie::new(
            title,
            year,
            collection! {
                INFO_RATING.to_string() => InfoValue::Float(rating),
                INFO_PLOT.to_string() => InfoValue::String(format!("plot of {title}")),
            },
        )
    }

    fn build_movies(n: usize) -> Vec<Movie> {
        (0..n)
            .map(|i| build_movie(&format!("Movie {i}"), 1980 + i as i64, 2.5))
            .collect()
    }

    fn build_key_map(year: i64, title: &str) -> HashMap<String, AttributeValue> {
        collection! {
            "year".to_string() => AttributeValue::N(year.to_string()),
            "title".to_string() => AttributeValue::S(title.to_string()),
        }
    }

    // Table lifecycle.
    // --------------------------------------------------

    #[tokio::test]
    async fn test_create_table() {
        let mut seq = Sequence::new();
        let mut backend = MockDynamoBackend::new();
        backend
            .expect_create_table()
            .withf(|table, definitions, key_schema, throughput| {
                table == "movies"
                    && definitions.len() == 2
                    && definitions[0].attribute_name() == "year"
                    && definitions[0].attribute_type() == &ScalarAttributeType::N
                    && definitions[1].attribute_name() == "title"
                    && definitions[1].attribute_type() == &ScalarAttributeType::S
                    && key_schema.len() == 2
                    && key_schema[0].attribute_name() == "year"
                    && key_schema[0].key_type() == &KeyType::Hash
                    && key_schema[1].attribute_name() == "title"
                    && key_schema[1].key_type() == &KeyType::Range
                    && throughput.read_capacity_units() == 10
                    && throughput.write_capacity_units() == 10
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _, _| Ok(CreateTableOutput::builder().build()));
        backend
            .expect_wait_for_table()
            .with(eq("movies".to_string()), eq(Duration::from_secs(300)))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));

        util(backend).create_table().await.unwrap();
    }

    #[tokio::test]
    async fn test_create_table_error_skips_wait() {
        let mut backend = MockDynamoBackend::new();
        backend
            .expect_create_table()
            .returning(|_, _, _, _| Err(SdkError::construction_failure("ResourceInUse")));
        backend.expect_wait_for_table().never();

        assert!(util(backend).create_table().await.is_err());
    }

    #[tokio::test]
    async fn test_list_tables_follows_pages() {
        let mut backend = MockDynamoBackend::new();
        backend
            .expect_list_tables()
            .with(eq(None))
            .times(1)
            .returning(|_| {
                Ok(ListTablesOutput::builder()
                    .set_table_names(Some(vec!["albums".to_string(), "movies".to_string()]))
                    .set_last_evaluated_table_name(Some("movies".to_string()))
                    .build())
            });
        backend
            .expect_list_tables()
            .with(eq(Some("movies".to_string())))
            .times(1)
            .returning(|_| {
                Ok(ListTablesOutput::builder()
                    .set_table_names(Some(vec!["songs".to_string()]))
                    .build())
            });

        let tables = util(backend).list_tables().await.unwrap();
        assert_eq!(tables, vec!["albums", "movies", "songs"]);
    }

    #[tokio::test]
    async fn test_delete_table() {
        let mut backend = MockDynamoBackend::new();
        backend
            .expect_delete_table()
            .with(eq("movies".to_string()))
            .times(1)
            .returning(|_| Ok(DeleteTableOutput::builder().build()));

        util(backend).delete_table().await.unwrap();
    }

    // Single items.
    // --------------------------------------------------

    #[tokio::test]
    async fn test_put_movie() {
        let movie = build_movie("Akira", 1988, 5.0);
        let expected_item = build_dynamo_map(&movie).unwrap();
        let mut backend = MockDynamoBackend::new();
        backend
            .expect_put_item()
            .with(eq("movies".to_string()), eq(expected_item))
            .times(1)
            .returning(|_, _| Ok(PutItemOutput::builder().build()));

        util(backend).put_movie(&movie).await.unwrap();
    }

    #[tokio::test]
    async fn test_put_movie_empty_title() {
        let backend = MockDynamoBackend::new();
        let movie = build_movie("", 1988, 5.0);
        assert!(util(backend).put_movie(&movie).await.is_err());
    }

    #[tokio::test]
    async fn test_get_movie() {
        let mut backend = MockDynamoBackend::new();
        backend
            .expect_get_item()
            .with(eq("movies".to_string()), eq(build_key_map(1988, "Akira")))
            .returning(|_, _| {
                Ok(GetItemOutput::builder()
                    .set_item(Some(
                        build_dynamo_map(&build_movie("Akira", 1988, 5.0)).unwrap(),
                    ))
                    .build())
            });

        let result = util(backend)
            .get_movie(&MovieKey::new(1988, "Akira").unwrap())
            .await
            .unwrap();
        assert_eq!(result, Some(build_movie("Akira", 1988, 5.0)));
    }

    #[tokio::test]
    async fn test_get_movie_not_found() {
        let mut backend = MockDynamoBackend::new();
        backend
            .expect_get_item()
            .returning(|_, _| Ok(GetItemOutput::builder().build()));

        let result = util(backend)
            .get_movie(&MovieKey::new(1988, "Akira").unwrap())
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_update_rating() {
        let mut backend = MockDynamoBackend::new();
        backend
            .expect_update_item()
            .withf(|table, key, update_expr, values, names| {
                table == "movies"
                    && key == &build_key_map(2023, "Barbie")
                    && update_expr == "SET #info.#rating = :rating"
                    && values.get(":rating") == Some(&AttributeValue::N("4.5".to_string()))
                    && names.get("#info").map(String::as_str) == Some("info")
                    && names.get("#rating").map(String::as_str) == Some("rating")
            })
            .times(1)
            .returning(|_, _, _, _, _| Ok(UpdateItemOutput::builder().build()));

        util(backend)
            .update_rating(&MovieKey::new(2023, "Barbie").unwrap(), 4.5)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_delete_movie() {
        let mut backend = MockDynamoBackend::new();
        backend
            .expect_delete_item()
            .with(eq("movies".to_string()), eq(build_key_map(1986, "Star Wars")))
            .times(1)
            .returning(|_, _| Ok(DeleteItemOutput::builder().build()));

        util(backend)
            .delete_movie(&MovieKey::new(1986, "Star Wars").unwrap())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_delete_movie_error() {
        let mut backend = MockDynamoBackend::new();
        backend
            .expect_delete_item()
            .returning(|_, _| Err(SdkError::construction_failure("Throttled")));

        let result = util(backend)
            .delete_movie(&MovieKey::new(1986, "Star Wars").unwrap())
            .await;
        assert!(result.is_err());
    }

    // Batch writes.
    // --------------------------------------------------

    #[tokio::test]
    async fn test_batch_put_movies_splits_into_chunks() {
        let mut seq = Sequence::new();
        let mut backend = MockDynamoBackend::new();
        backend
            .expect_batch_write_item()
            .withf(|table, requests| {
                table == "movies"
                    && requests.len() == 25
                    && requests.iter().all(|r| r.put_request().is_some())
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(BatchWriteItemOutput::builder().build()));
        backend
            .expect_batch_write_item()
            .withf(|table, requests| table == "movies" && requests.len() == 5)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(BatchWriteItemOutput::builder().build()));

        let movies = build_movies(30);
        let report = util(backend).batch_put_movies(&movies, 30).await.unwrap();
        assert_eq!(report.batches, 2);
        assert_eq!(report.written, 30);
        assert!(report.unprocessed.is_empty());
    }

    #[tokio::test]
    async fn test_batch_put_movies_respects_cap() {
        let mut backend = MockDynamoBackend::new();
        backend
            .expect_batch_write_item()
            .withf(|_, requests| requests.len() == 7)
            .times(1)
            .returning(|_, _| Ok(BatchWriteItemOutput::builder().build()));

        let movies = build_movies(10);
        let report = util(backend).batch_put_movies(&movies, 7).await.unwrap();
        assert_eq!(report.batches, 1);
        assert_eq!(report.written, 7);
    }

    #[tokio::test]
    async fn test_batch_put_movies_cap_larger_than_input() {
        let mut backend = MockDynamoBackend::new();
        backend
            .expect_batch_write_item()
            .withf(|_, requests| requests.len() == 5)
            .times(1)
            .returning(|_, _| Ok(BatchWriteItemOutput::builder().build()));

        let movies = build_movies(5);
        let report = util(backend).batch_put_movies(&movies, 100).await.unwrap();
        assert_eq!(report.batches, 1);
        assert_eq!(report.written, 5);
    }

    #[tokio::test]
    async fn test_batch_put_movies_call_count() {
        for (n, cap) in [(0, 10), (10, 0), (1, 1), (25, 25), (26, 26), (60, 51), (80, 75)] {
            let expected_calls = n.min(cap).div_ceil(BATCH_WRITE_LIMIT);
            let mut backend = MockDynamoBackend::new();
            backend
                .expect_batch_write_item()
                .withf(|_, requests| !requests.is_empty() && requests.len() <= BATCH_WRITE_LIMIT)
                .times(expected_calls)
                .returning(|_, _| Ok(BatchWriteItemOutput::builder().build()));

            let movies = build_movies(n);
            let report = util(backend).batch_put_movies(&movies, cap).await.unwrap();
            assert_eq!(report.batches, expected_calls, "n={n}, cap={cap}");
            assert_eq!(report.written, n.min(cap), "n={n}, cap={cap}");
        }
    }

    #[tokio::test]
    async fn test_batch_put_movies_reports_unprocessed() {
        let mut backend = MockDynamoBackend::new();
        backend.expect_batch_write_item().returning(|_, requests| {
            let leftover = WriteRequest::builder()
                .put_request(
                    PutRequest::builder()
                        .set_item(Some(requests[1].put_request().unwrap().item().clone()))
                        .build()
                        .unwrap(),
                )
                .build();
            Ok(BatchWriteItemOutput::builder()
                .set_unprocessed_items(Some(collection! {
                    "movies".to_string() => vec![leftover],
                }))
                .build())
        });

        let movies = build_movies(3);
        let report = util(backend).batch_put_movies(&movies, 3).await.unwrap();
        assert_eq!(report.batches, 1);
        assert_eq!(report.written, 2);
        assert_eq!(report.unprocessed, vec![movies[1].clone()]);
    }

    #[tokio::test]
    async fn test_batch_put_movies_stops_on_error() {
        let mut seq = Sequence::new();
        let mut backend = MockDynamoBackend::new();
        backend
            .expect_batch_write_item()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(BatchWriteItemOutput::builder().build()));
        backend
            .expect_batch_write_item()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Err(SdkError::construction_failure("ProvisionedThroughputExceeded")));

        let movies = build_movies(75);
        assert!(util(backend).batch_put_movies(&movies, 75).await.is_err());
    }

    #[tokio::test]
    async fn test_batch_put_movies_invalid_key_aborts_before_call() {
        let mut backend = MockDynamoBackend::new();
        backend.expect_batch_write_item().never();

        let mut movies = build_movies(3);
        movies[2].title = String::new();
        assert!(util(backend).batch_put_movies(&movies, 3).await.is_err());
    }

    // Scans and queries.
    // --------------------------------------------------

    #[tokio::test]
    async fn test_scan_reads_all_pages() {
        let page_key = build_key_map(1988, "Akira");
        let mut backend = MockDynamoBackend::new();
        backend
            .expect_scan()
            .with(
                eq("movies".to_string()),
                eq(None),
                eq(None),
                eq(None),
                eq(None),
                eq(None),
            )
            .times(1)
            .returning(|_, _, _, _, _, _| {
                Ok(ScanOutput::builder()
                    .set_items(Some(vec![
                        build_dynamo_map(&build_movie("Scarface", 1983, 3.0)).unwrap(),
                        build_dynamo_map(&build_movie("Akira", 1988, 5.0)).unwrap(),
                    ]))
                    .set_last_evaluated_key(Some(build_key_map(1988, "Akira")))
                    .build())
            });
        backend
            .expect_scan()
            .with(
                eq("movies".to_string()),
                eq(None),
                eq(None),
                eq(None),
                eq(None),
                eq(Some(page_key)),
            )
            .times(1)
            .returning(|_, _, _, _, _, _| {
                Ok(ScanOutput::builder()
                    .set_items(Some(vec![
                        build_dynamo_map(&build_movie("Barbie", 2023, 3.0)).unwrap()
                    ]))
                    .build())
            });

        let movies = util(backend).scan().await.unwrap();
        let titles: Vec<&str> = movies.iter().map(|m| m.title.as_str()).collect();
        assert_eq!(titles, vec!["Scarface", "Akira", "Barbie"]);
    }

    #[tokio::test]
    async fn test_scan_tolerates_null_info() {
        let mut backend = MockDynamoBackend::new();
        backend
            .expect_scan()
            .times(1)
            .returning(|_, _, _, _, _, _| {
                Ok(ScanOutput::builder()
                    .set_items(Some(vec![
                        build_dynamo_map(&build_movie("Scarface", 1983, 3.0)).unwrap(),
                        collection! {
                            "year".to_string() => AttributeValue::N("1988".to_string()),
                            "title".to_string() => AttributeValue::S("Akira".to_string()),
                            "info".to_string() => AttributeValue::Null(true),
                        },
                        collection! {
                            "year".to_string() => AttributeValue::N("2023".to_string()),
                            "title".to_string() => AttributeValue::S("Barbie".to_string()),
                            "info".to_string() => AttributeValue::M(collection! {
                                "rating".to_string() => AttributeValue::Null(true),
                            }),
                        },
                    ]))
                    .build())
            });

        let movies = util(backend).scan().await.unwrap();
        assert_eq!(movies.len(), 3);
        assert!(movies[1].info.is_empty());
        assert_eq!(movies[2].rating(), Some(&InfoValue::Null));
    }

    #[tokio::test]
    async fn test_scan_by_year() {
        let mut backend = MockDynamoBackend::new();
        backend
            .expect_scan()
            .withf(|table, filter, projection, names, values, start| {
                let names = names.as_ref().unwrap();
                let values = values.as_ref().unwrap();
                table == "movies"
                    && filter.as_deref() == Some("#year BETWEEN :start_year AND :end_year")
                    && projection.as_deref() == Some("#year, #title, #info.#rating")
                    && names.get("#year").map(String::as_str) == Some("year")
                    && names.get("#title").map(String::as_str) == Some("title")
                    && names.get("#info").map(String::as_str) == Some("info")
                    && names.get("#rating").map(String::as_str) == Some("rating")
                    && values.get(":start_year") == Some(&AttributeValue::N("1980".to_string()))
                    && values.get(":end_year") == Some(&AttributeValue::N("1990".to_string()))
                    && start.is_none()
            })
            .times(1)
            .returning(|_, _, _, _, _, _| {
                Ok(ScanOutput::builder()
                    .set_items(Some(vec![collection! {
                        "year".to_string() => AttributeValue::N("1988".to_string()),
                        "title".to_string() => AttributeValue::S("Akira".to_string()),
                        "info".to_string() => AttributeValue::M(collection! {
                            "rating".to_string() => AttributeValue::N("5".to_string()),
                        }),
                    }]))
                    .build())
            });

        let movies = util(backend).scan_by_year(1980, 1990).await.unwrap();
        assert_eq!(movies.len(), 1);
        assert_eq!(movies[0].title, "Akira");
        assert_eq!(movies[0].rating(), Some(&InfoValue::Integer(5)));
        assert_eq!(movies[0].plot(), None);
    }

    #[tokio::test]
    async fn test_query_by_year() {
        let mut backend = MockDynamoBackend::new();
        backend
            .expect_query()
            .with(
                eq("movies".to_string()),
                eq("#year = :year".to_string()),
                eq::<HashMap<String, String>>(collection! {
                    "#year".to_string() => "year".to_string(),
                }),
                eq::<HashMap<String, AttributeValue>>(collection! {
                    ":year".to_string() => AttributeValue::N("2023".to_string()),
                }),
                eq(None),
            )
            .times(1)
            .returning(|_, _, _, _, _| {
                Ok(QueryOutput::builder()
                    .set_items(Some(vec![
                        build_dynamo_map(&build_movie("Barbie", 2023, 3.0)).unwrap(),
                        build_dynamo_map(&build_movie("Super Mario Bros", 2023, 2.5)).unwrap(),
                    ]))
                    .build())
            });

        let movies = util(backend).query_by_year(2023).await.unwrap();
        assert_eq!(
            movies,
            vec![
                build_movie("Barbie", 2023, 3.0),
                build_movie("Super Mario Bros", 2023, 2.5)
            ]
        );
    }

    #[tokio::test]
    async fn test_query_by_year_error() {
        let mut backend = MockDynamoBackend::new();
        backend
            .expect_query()
            .returning(|_, _, _, _, _| Err(SdkError::construction_failure("ValidationException")));

        assert!(util(backend).query_by_year(2023).await.is_err());
    }
}
