// tests/exam_tests.rs

use school_api::{config::Config, routes, state::AppState};
use serde_json::{Value, json};

async fn spawn_app() -> String {
    let state = AppState::new(Config::default());
    let app = routes::create_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    address
}

async fn post_json(client: &reqwest::Client, url: String, body: Value) -> (u16, Value) {
    let resp = client.post(url).json(&body).send().await.unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap_or(Value::Null))
}

async fn put_json(client: &reqwest::Client, url: String, body: Value) -> (u16, Value) {
    let resp = client.put(url).json(&body).send().await.unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap_or(Value::Null))
}

async fn set_status(client: &reqwest::Client, address: &str, category_id: i64, status: &str) -> u16 {
    put_json(
        client,
        format!("{}/api/exam-categories/{}", address, category_id),
        json!({ "status": status }),
    )
    .await
    .0
}

/// Student + category with Math (100) and Science (100), moved into `scoring`.
async fn scoring_setup(client: &reqwest::Client, address: &str) -> (Value, i64, i64, i64) {
    let (_, student) = post_json(
        client,
        format!("{}/api/students", address),
        json!({ "name": "Nora", "date_of_birth": "2012-03-04" }),
    )
    .await;

    let (status, category) = post_json(
        client,
        format!("{}/api/exam-categories", address),
        json!({ "name": "First Term" }),
    )
    .await;
    assert_eq!(status, 201);
    assert_eq!(category["status"], "draft");
    let category_id = category["id"].as_i64().unwrap();

    let mut subject_ids = Vec::new();
    for (name, order) in [("Math", 1), ("Science", 2)] {
        let (status, subject) = post_json(
            client,
            format!("{}/api/exam-categories/{}/subjects", address, category_id),
            json!({ "name": name, "max_score": 100, "order": order }),
        )
        .await;
        assert_eq!(status, 201);
        subject_ids.push(subject["id"].as_i64().unwrap());
    }

    for status in ["open", "closed", "scoring"] {
        assert_eq!(set_status(client, address, category_id, status).await, 200);
    }

    (student, category_id, subject_ids[0], subject_ids[1])
}

#[tokio::test]
async fn status_lifecycle_only_moves_one_step_forward() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let (_, category) = post_json(
        &client,
        format!("{}/api/exam-categories", address),
        json!({ "name": "Finals" }),
    )
    .await;
    let id = category["id"].as_i64().unwrap();

    assert_eq!(set_status(&client, &address, id, "scoring").await, 409);
    assert_eq!(set_status(&client, &address, id, "draft").await, 200);
    assert_eq!(set_status(&client, &address, id, "open").await, 200);
    assert_eq!(set_status(&client, &address, id, "draft").await, 409);
    assert_eq!(set_status(&client, &address, id, "closed").await, 200);
    assert_eq!(set_status(&client, &address, id, "scoring").await, 200);
    assert_eq!(set_status(&client, &address, id, "published").await, 200);
    assert_eq!(set_status(&client, &address, id, "scoring").await, 409);

    // Subjects are frozen once published
    let (status, _) = post_json(
        &client,
        format!("{}/api/exam-categories/{}/subjects", address, id),
        json!({ "name": "Late", "max_score": 10 }),
    )
    .await;
    assert_eq!(status, 409);
}

#[tokio::test]
async fn scores_aggregate_and_publish_to_public_results() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let (student, category_id, math, science) = scoring_setup(&client, &address).await;
    let student_id = student["id"].as_i64().unwrap();
    let registration_number = student["registration_number"].as_str().unwrap().to_string();

    // Enter scores; the first Math entry is corrected by re-submission
    let (status, _) = post_json(
        &client,
        format!("{}/api/exam-results", address),
        json!({ "category_id": category_id, "student_id": student_id, "subject_id": math, "score": 50 }),
    )
    .await;
    assert_eq!(status, 201);

    let (status, corrected) = post_json(
        &client,
        format!("{}/api/exam-results", address),
        json!({ "category_id": category_id, "student_id": student_id, "subject_id": math, "score": 80 }),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(corrected["score"], 80.0);

    let (status, _) = post_json(
        &client,
        format!("{}/api/exam-results", address),
        json!({ "category_id": category_id, "student_id": student_id, "subject_id": science, "score": 60 }),
    )
    .await;
    assert_eq!(status, 201);

    // Score above max is refused
    let (status, _) = post_json(
        &client,
        format!("{}/api/exam-results", address),
        json!({ "category_id": category_id, "student_id": student_id, "subject_id": science, "score": 101 }),
    )
    .await;
    assert_eq!(status, 400);

    let results: Vec<Value> = client
        .get(format!("{}/api/exam-results?category_id={}", address, category_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(results.len(), 2);

    // Staff summary
    let summary: Value = client
        .get(format!("{}/api/exam-categories/{}/summary", address, category_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let row = &summary["results"][0];
    assert_eq!(row["total_score"], 140.0);
    assert_eq!(row["max_total_score"], 200.0);
    assert_eq!(row["percentage"], 70.0);
    assert_eq!(row["grade"], "B+");
    assert_eq!(row["position"], 1);
    assert_eq!(row["passed"], true);
    assert_eq!(row["student_name"], "Nora");
    assert_eq!(summary["passed"], 1);

    // Not visible publicly until published
    let lookup = format!(
        "{}/api/public/results?registration_number={}&date_of_birth=2012-03-04",
        address, registration_number
    );
    let before: Value = client.get(&lookup).send().await.unwrap().json().await.unwrap();
    assert_eq!(before["results"], json!([]));

    assert_eq!(set_status(&client, &address, category_id, "published").await, 200);

    let after: Value = client.get(&lookup).send().await.unwrap().json().await.unwrap();
    assert_eq!(after["student_name"], "Nora");
    let published = &after["results"][0];
    assert_eq!(published["category_name"], "First Term");
    assert_eq!(published["percentage"], 70.0);
    assert_eq!(published["subjects"][0]["subject_name"], "Math");
    assert_eq!(published["subjects"][0]["pass_marks"], 25.0);

    // Scores are locked after publication
    let (status, _) = post_json(
        &client,
        format!("{}/api/exam-results", address),
        json!({ "category_id": category_id, "student_id": student_id, "subject_id": math, "score": 99 }),
    )
    .await;
    assert_eq!(status, 409);
}

#[tokio::test]
async fn public_results_require_matching_date_of_birth() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let (student, _, _, _) = scoring_setup(&client, &address).await;
    let registration_number = student["registration_number"].as_str().unwrap();

    let wrong_dob = client
        .get(format!(
            "{}/api/public/results?registration_number={}&date_of_birth=2012-03-05",
            address, registration_number
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(wrong_dob.status().as_u16(), 404);

    let unknown = client
        .get(format!(
            "{}/api/public/results?registration_number=00000000&date_of_birth=2012-03-04",
            address
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(unknown.status().as_u16(), 404);
}

#[tokio::test]
async fn scores_rejected_outside_scoring_phase() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let (_, student) = post_json(
        &client,
        format!("{}/api/students", address),
        json!({ "name": "Omar", "date_of_birth": "2012-01-01" }),
    )
    .await;
    let (_, category) = post_json(
        &client,
        format!("{}/api/exam-categories", address),
        json!({ "name": "Quiz Week" }),
    )
    .await;
    let category_id = category["id"].as_i64().unwrap();
    let (_, subject) = post_json(
        &client,
        format!("{}/api/exam-categories/{}/subjects", address, category_id),
        json!({ "name": "History", "max_score": 50 }),
    )
    .await;

    let (status, body) = post_json(
        &client,
        format!("{}/api/exam-results", address),
        json!({
            "category_id": category_id,
            "student_id": student["id"],
            "subject_id": subject["id"],
            "score": 40
        }),
    )
    .await;
    assert_eq!(status, 409);
    assert!(body["error"].as_str().unwrap().contains("scoring"));
}

#[tokio::test]
async fn bulk_entry_is_all_or_nothing() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let (student, category_id, math, science) = scoring_setup(&client, &address).await;
    let student_id = student["id"].as_i64().unwrap();

    let (status, body) = post_json(
        &client,
        format!("{}/api/exam-results/bulk", address),
        json!({
            "category_id": category_id,
            "entries": [
                { "student_id": student_id, "subject_id": math, "score": 70 },
                { "student_id": student_id, "subject_id": science, "score": 150 }
            ]
        }),
    )
    .await;
    assert_eq!(status, 400);
    assert!(body["error"].as_str().unwrap().starts_with("Entry 1"));

    let stored: Vec<Value> = client
        .get(format!("{}/api/exam-results?student_id={}", address, student_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(stored.is_empty());

    let (status, body) = post_json(
        &client,
        format!("{}/api/exam-results/bulk", address),
        json!({
            "category_id": category_id,
            "entries": [
                { "student_id": student_id, "subject_id": math, "score": 70 },
                { "student_id": student_id, "subject_id": science, "score": 20 }
            ]
        }),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["created"], 2);
    assert_eq!(body["updated"], 0);

    // Science 20 is below the default pass mark of 25
    let summary: Value = client
        .get(format!("{}/api/exam-categories/{}/summary", address, category_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(summary["results"][0]["total_score"], 90.0);
    assert_eq!(summary["results"][0]["passed"], false);
}

#[tokio::test]
async fn only_selected_students_can_be_scored() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let (student, category_id, math, _) = scoring_setup(&client, &address).await;

    let (_, outsider) = post_json(
        &client,
        format!("{}/api/students", address),
        json!({ "name": "Pia", "date_of_birth": "2012-06-06" }),
    )
    .await;

    let (status, _) = put_json(
        &client,
        format!("{}/api/exam-categories/{}", address, category_id),
        json!({ "selected_student_ids": [student["id"]] }),
    )
    .await;
    assert_eq!(status, 200);

    let (status, _) = post_json(
        &client,
        format!("{}/api/exam-results", address),
        json!({
            "category_id": category_id,
            "student_id": outsider["id"],
            "subject_id": math,
            "score": 10
        }),
    )
    .await;
    assert_eq!(status, 400);

    // The selected student shows up in the summary even without scores
    let summary: Value = client
        .get(format!("{}/api/exam-categories/{}/summary", address, category_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(summary["students"], 1);
    assert_eq!(summary["results"][0]["total_score"], 0.0);
    assert_eq!(summary["results"][0]["grade"], "F");
}

#[tokio::test]
async fn deleting_a_subject_removes_its_scores() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let (student, category_id, math, science) = scoring_setup(&client, &address).await;

    for subject in [math, science] {
        post_json(
            &client,
            format!("{}/api/exam-results", address),
            json!({
                "category_id": category_id,
                "student_id": student["id"],
                "subject_id": subject,
                "score": 30
            }),
        )
        .await;
    }

    let resp = client
        .delete(format!(
            "{}/api/exam-categories/{}/subjects/{}",
            address, category_id, science
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 204);

    let remaining: Vec<Value> = client
        .get(format!("{}/api/exam-results?category_id={}", address, category_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0]["subject_id"], math);

    // Max score cannot drop below an entered score
    let (status, _) = put_json(
        &client,
        format!("{}/api/exam-categories/{}/subjects/{}", address, category_id, math),
        json!({ "max_score": 20 }),
    )
    .await;
    assert_eq!(status, 409);
}

#[tokio::test]
async fn scored_student_stays_reported_after_leaving_the_selection() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let (student, category_id, math, science) = scoring_setup(&client, &address).await;
    let student_id = student["id"].as_i64().unwrap();
    let registration_number = student["registration_number"].as_str().unwrap().to_string();

    for (subject, score) in [(math, 80), (science, 60)] {
        let (status, _) = post_json(
            &client,
            format!("{}/api/exam-results", address),
            json!({
                "category_id": category_id,
                "student_id": student_id,
                "subject_id": subject,
                "score": score
            }),
        )
        .await;
        assert_eq!(status, 201);
    }

    let (_, other) = post_json(
        &client,
        format!("{}/api/students", address),
        json!({ "name": "Pia", "date_of_birth": "2012-06-06" }),
    )
    .await;

    let (status, _) = put_json(
        &client,
        format!("{}/api/exam-categories/{}", address, category_id),
        json!({ "selected_student_ids": [other["id"]] }),
    )
    .await;
    assert_eq!(status, 200);

    let summary: Value = client
        .get(format!("{}/api/exam-categories/{}/summary", address, category_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(summary["students"], 2);
    assert_eq!(summary["results"][0]["student_id"], student_id);
    assert_eq!(summary["results"][0]["total_score"], 140.0);

    assert_eq!(set_status(&client, &address, category_id, "published").await, 200);

    let published: Value = client
        .get(format!(
            "{}/api/public/results?registration_number={}&date_of_birth=2012-03-04",
            address, registration_number
        ))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let results = published["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["percentage"], 70.0);
}
