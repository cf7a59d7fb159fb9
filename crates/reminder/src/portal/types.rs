/// Wire types for the course platform's JSON endpoints
use serde::Deserialize;

use crate::deadline::{AssignmentRecord, SubmissionStatus};

#[derive(Debug, Deserialize)]
pub struct SemesterEnvelope {
    #[serde(default)]
    pub result: Vec<Semester>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Semester {
    #[serde(rename = "xqName", default)]
    pub name: String,
    #[serde(rename = "xqCode", default)]
    pub code: String,
    #[serde(rename = "beginDate", default)]
    pub begin_date: String,
    #[serde(rename = "endDate", default)]
    pub end_date: String,
}

#[derive(Debug, Deserialize)]
pub struct UserInfoEnvelope {
    #[serde(rename = "userInfo", default)]
    pub user_info: Option<UserInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserInfo {
    #[serde(rename = "STU_NO", default)]
    pub student_no: Option<String>,
    #[serde(rename = "STU_NAME", default)]
    pub name: Option<String>,
    #[serde(rename = "SCHOOL", default)]
    pub school: Option<String>,
    #[serde(rename = "PROFESSION", default)]
    pub profession: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CourseListEnvelope {
    #[serde(rename = "courseList", default)]
    pub course_list: Vec<Course>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Course {
    /// Ids arrive as either a number or a string depending on the endpoint.
    #[serde(default)]
    pub id: serde_json::Value,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "course_num", default)]
    pub course_num: Option<String>,
    #[serde(rename = "teacher_name", default)]
    pub teacher_name: Option<String>,
}

impl Course {
    pub fn id_str(&self) -> String {
        value_to_string(&self.id)
    }
}

#[derive(Debug, Deserialize)]
pub struct HomeworkEnvelope {
    #[serde(rename = "courseNoteList", default)]
    pub course_note_list: Vec<RawHomework>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawHomework {
    #[serde(default)]
    pub id: serde_json::Value,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "open_date", default)]
    pub open_date: Option<String>,
    #[serde(rename = "end_time", default)]
    pub end_time: Option<String>,
    #[serde(rename = "subStatus", default)]
    pub sub_status: String,
    #[serde(rename = "stu_score", default)]
    pub stu_score: serde_json::Value,
}

impl RawHomework {
    /// Converts one wire row into the classifier's input shape.
    pub fn into_record(self, course_name: &str) -> AssignmentRecord {
        AssignmentRecord {
            id: value_to_string(&self.id),
            title: self.title,
            course_name: course_name.to_string(),
            end_time: self.end_time,
            submission_status: SubmissionStatus::from_portal(&self.sub_status),
            score: value_to_f64(&self.stu_score),
        }
    }
}

fn value_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn value_to_f64(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
