// src/store.rs

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{Datelike, Utc};
use tokio::sync::RwLock;

use crate::{
    models::{
        admission::{AdmissionApplication, AdmissionSettings},
        class::SchoolClass,
        exam::{ExamCategory, ExamResult, Subject},
        quiz::{Quiz, QuizAttempt},
        student::Student,
    },
    scoring::exam::{RankedReport, rank, student_report},
};

/// Shared handle to the in-process store.
///
/// Handlers hold the write guard across validation and mutation, so each
/// request is applied atomically.
pub type Db = Arc<RwLock<Tables>>;

pub fn new_db() -> Db {
    Arc::new(RwLock::new(Tables::default()))
}

/// Rows keyed by an auto-incremented id, starting at 1.
#[derive(Debug)]
pub struct Table<T> {
    rows: BTreeMap<i64, T>,
    last_id: i64,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            last_id: 0,
        }
    }
}

impl<T> Table<T> {
    /// Allocates the next id and stores the row built from it.
    pub fn insert_with(&mut self, build: impl FnOnce(i64) -> T) -> &T {
        self.last_id += 1;
        let id = self.last_id;
        self.rows.entry(id).or_insert(build(id))
    }

    pub fn get(&self, id: i64) -> Option<&T> {
        self.rows.get(&id)
    }

    pub fn get_mut(&mut self, id: i64) -> Option<&mut T> {
        self.rows.get_mut(&id)
    }

    pub fn contains(&self, id: i64) -> bool {
        self.rows.contains_key(&id)
    }

    pub fn remove(&mut self, id: i64) -> Option<T> {
        self.rows.remove(&id)
    }

    /// Rows in id order.
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.rows.values()
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.rows.values_mut()
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&T) -> bool) {
        self.rows.retain(|_, row| keep(row));
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct Tables {
    pub admission_settings: AdmissionSettings,
    pub applications: Table<AdmissionApplication>,
    pub students: Table<Student>,
    pub classes: Table<SchoolClass>,
    pub categories: Table<ExamCategory>,
    pub subjects: Table<Subject>,
    pub results: Table<ExamResult>,
    pub quizzes: Table<Quiz>,
    pub attempts: Table<QuizAttempt>,
    registration_seq: u32,
}

impl Tables {
    /// Next registration number: year prefix from the academic year (or the
    /// current year) followed by a zero-padded sequence, e.g. `20260001`.
    pub fn issue_registration_number(&mut self) -> String {
        let year: String = self
            .admission_settings
            .academic_year
            .chars()
            .take_while(char::is_ascii_digit)
            .collect();
        let prefix = if year.len() == 4 {
            year
        } else {
            Utc::now().year().to_string()
        };

        loop {
            self.registration_seq += 1;
            let candidate = format!("{}{:04}", prefix, self.registration_seq);
            if self.student_by_registration(&candidate).is_none() {
                return candidate;
            }
        }
    }

    pub fn student_by_registration(&self, registration_number: &str) -> Option<&Student> {
        self.students
            .values()
            .find(|s| s.registration_number == registration_number)
    }

    /// Makes `class_id` the only class listing `student_ids`, and keeps each
    /// student's `class_id` in step. Students dropped from the class are unassigned.
    pub fn assign_students(&mut self, class_id: i64, student_ids: Vec<i64>) {
        let incoming: BTreeSet<i64> = student_ids.iter().copied().collect();

        for class in self.classes.values_mut() {
            if class.id != class_id {
                class.student_ids.retain(|id| !incoming.contains(id));
            }
        }

        for student in self.students.values_mut() {
            if incoming.contains(&student.id) {
                student.class_id = Some(class_id);
            } else if student.class_id == Some(class_id) {
                student.class_id = None;
            }
        }

        if let Some(class) = self.classes.get_mut(class_id) {
            class.student_ids = student_ids;
        }
    }

    /// Subjects of a category in display order.
    pub fn subjects_of(&self, category_id: i64) -> Vec<Subject> {
        let mut subjects: Vec<Subject> = self
            .subjects
            .values()
            .filter(|s| s.category_id == category_id)
            .cloned()
            .collect();
        subjects.sort_by_key(|s| (s.order, s.id));
        subjects
    }

    pub fn find_result(&self, student_id: i64, subject_id: i64) -> Option<&ExamResult> {
        self.results
            .values()
            .find(|r| r.student_id == student_id && r.subject_id == subject_id)
    }

    /// Students reported for a category: the selection, followed by anyone
    /// else holding at least one score in it.
    fn students_in_category(&self, category: &ExamCategory) -> Vec<i64> {
        let scored: BTreeSet<i64> = self
            .results
            .values()
            .filter(|r| r.category_id == category.id)
            .map(|r| r.student_id)
            .collect();

        let mut students = category.selected_student_ids.clone();
        students.extend(
            scored
                .into_iter()
                .filter(|id| !category.selected_student_ids.contains(id)),
        );
        students
    }

    /// Ranked reports of every student in the category. `None` if it does not exist.
    pub fn category_reports(&self, category_id: i64, pass_mark_ratio: f64) -> Option<Vec<RankedReport>> {
        let category = self.categories.get(category_id)?;
        let subjects = self.subjects_of(category_id);

        let reports = self
            .students_in_category(category)
            .into_iter()
            .map(|student_id| {
                let entries: Vec<(i64, f64)> = self
                    .results
                    .values()
                    .filter(|r| r.category_id == category_id && r.student_id == student_id)
                    .map(|r| (r.subject_id, r.score))
                    .collect();
                student_report(student_id, &subjects, &entries, pass_mark_ratio)
            })
            .collect();

        Some(rank(reports))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn add_student(tables: &mut Tables, name: &str) -> i64 {
        let registration_number = tables.issue_registration_number();
        tables
            .students
            .insert_with(|id| Student {
                id,
                registration_number,
                name: name.to_string(),
                date_of_birth: NaiveDate::from_ymd_opt(2015, 1, 1).unwrap(),
                phone: None,
                class_id: None,
                created_at: Utc::now(),
            })
            .id
    }

    fn add_class(tables: &mut Tables, name: &str) -> i64 {
        tables
            .classes
            .insert_with(|id| SchoolClass {
                id,
                name: name.to_string(),
                section: None,
                student_ids: vec![],
                teacher_ids: vec![],
                book_ids: vec![],
                created_at: Utc::now(),
            })
            .id
    }

    #[test]
    fn ids_start_at_one_and_are_never_reused() {
        let mut table: Table<&str> = Table::default();
        table.insert_with(|_| "a");
        table.insert_with(|_| "b");
        table.remove(2);
        let row = *table.insert_with(|id| if id == 3 { "c" } else { "?" });
        assert_eq!(row, "c");
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn registration_numbers_use_academic_year_prefix() {
        let mut tables = Tables::default();
        tables.admission_settings.academic_year = "2031-2032".to_string();

        assert_eq!(tables.issue_registration_number(), "20310001");
        assert_eq!(tables.issue_registration_number(), "20310002");
    }

    #[test]
    fn moving_a_student_removes_them_from_the_old_class() {
        let mut tables = Tables::default();
        let ana = add_student(&mut tables, "Ana");
        let ben = add_student(&mut tables, "Ben");
        let five_a = add_class(&mut tables, "5A");
        let five_b = add_class(&mut tables, "5B");

        tables.assign_students(five_a, vec![ana, ben]);
        tables.assign_students(five_b, vec![ben]);

        assert_eq!(tables.classes.get(five_a).unwrap().student_ids, vec![ana]);
        assert_eq!(tables.classes.get(five_b).unwrap().student_ids, vec![ben]);
        assert_eq!(tables.students.get(ben).unwrap().class_id, Some(five_b));

        tables.assign_students(five_a, vec![]);
        assert_eq!(tables.students.get(ana).unwrap().class_id, None);
    }
}
