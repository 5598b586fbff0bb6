//! Notification texts

/// Fields of the instructor's new-student email
#[derive(Debug, Clone)]
pub struct NewStudentEmail<'a> {
    pub instructor_name: &'a str,
    pub course_title: &'a str,
    pub student_name: &'a str,
    pub student_email: &'a str,
}

/// Plain-text body of the instructor's new-student email
pub fn render_new_student_email(email: &NewStudentEmail<'_>) -> String {
    format!(
        "Hi {instructor},\n\
         \n\
         Good news! {student} ({student_email}) has just purchased your course \"{course}\".\n\
         \n\
         Head over to your dashboard to welcome your new student.\n",
        instructor = email.instructor_name,
        student = email.student_name,
        student_email = email.student_email,
        course = email.course_title,
    )
}

/// Detail line of the instructor's in-app notification
pub fn new_student_detail(course_title: &str, student_name: &str) -> String {
    format!("{} has been purchased by {}", course_title, student_name)
}
