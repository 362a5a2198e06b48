use anyhow::{anyhow, Context};

use crate::db::{Store, KEY_STUDENTS, KEY_TRANSCRIPTS};
use crate::model::{new_student_with_transcript, Student, Transcript};

/// Owns the two parallel collections and their persistence. Students and
/// transcripts are linked 1:1 via `transcript_id` / the embedded student
/// copy; every successful mutation rewrites the affected collection in the
/// store as a full snapshot.
pub struct Registry {
    students: Vec<Student>,
    transcripts: Vec<Transcript>,
    store: Option<Store>,
}

impl Registry {
    pub fn open(store: Store) -> anyhow::Result<Registry> {
        let students = store
            .get_collection(KEY_STUDENTS)
            .context("failed to load students")?;
        let transcripts = store
            .get_collection(KEY_TRANSCRIPTS)
            .context("failed to load transcripts")?;
        log::info!(
            "registry loaded: {} students, {} transcripts",
            students.len(),
            transcripts.len()
        );
        Ok(Registry {
            students,
            transcripts,
            store: Some(store),
        })
    }

    /// Unpersisted registry, used by the import pipeline's unit tests.
    #[cfg(test)]
    pub fn in_memory() -> Registry {
        Registry {
            students: Vec::new(),
            transcripts: Vec::new(),
            store: None,
        }
    }

    pub fn store(&self) -> Option<&Store> {
        self.store.as_ref()
    }

    pub fn students(&self) -> &[Student] {
        &self.students
    }

    pub fn transcripts(&self) -> &[Transcript] {
        &self.transcripts
    }

    pub fn find_student(&self, id: &str) -> Option<&Student> {
        self.students.iter().find(|s| s.id == id)
    }

    /// Business-key lookup. Admission number is the only field the merge
    /// engine may deduplicate on.
    pub fn find_by_admission_number(&self, admission_number: &str) -> Option<&Student> {
        self.students
            .iter()
            .find(|s| s.admission_number == admission_number)
    }

    pub fn transcript(&self, id: &str) -> Option<&Transcript> {
        self.transcripts.iter().find(|t| t.id == id)
    }

    pub fn transcript_for_student(&self, student_id: &str) -> Option<&Transcript> {
        let student = self.find_student(student_id)?;
        self.transcript(&student.transcript_id)
    }

    /// Creates the student and its default-seeded transcript in one
    /// synchronous operation.
    pub fn add_student(
        &mut self,
        name: &str,
        admission_number: &str,
        course: &str,
        school_year: &str,
    ) -> anyhow::Result<Student> {
        if self.find_by_admission_number(admission_number).is_some() {
            return Err(anyhow!(
                "admission number {} already registered",
                admission_number
            ));
        }
        let (student, transcript) =
            new_student_with_transcript(name, admission_number, course, school_year);
        self.students.push(student.clone());
        self.transcripts.push(transcript);
        self.persist_students()?;
        self.persist_transcripts()?;
        Ok(student)
    }

    /// Replaces a student record and syncs the embedded copy in its
    /// transcript.
    pub fn update_student(&mut self, student: Student) -> anyhow::Result<()> {
        let Some(slot) = self.students.iter_mut().find(|s| s.id == student.id) else {
            return Err(anyhow!("student {} not found", student.id));
        };
        *slot = student.clone();
        if let Some(t) = self
            .transcripts
            .iter_mut()
            .find(|t| t.id == student.transcript_id)
        {
            t.student = student;
        }
        self.persist_students()?;
        self.persist_transcripts()?;
        Ok(())
    }

    /// Deletes a student and cascades to its transcript. Returns false when
    /// the id is unknown.
    pub fn delete_student(&mut self, student_id: &str) -> anyhow::Result<bool> {
        let Some(pos) = self.students.iter().position(|s| s.id == student_id) else {
            return Ok(false);
        };
        let student = self.students.remove(pos);
        self.transcripts.retain(|t| t.id != student.transcript_id);
        self.persist_students()?;
        self.persist_transcripts()?;
        Ok(true)
    }

    /// Replaces a transcript wholesale (object replacement, not in-place
    /// field mutation).
    pub fn update_transcript(&mut self, transcript: Transcript) -> anyhow::Result<()> {
        let Some(slot) = self.transcripts.iter_mut().find(|t| t.id == transcript.id) else {
            return Err(anyhow!("transcript {} not found", transcript.id));
        };
        *slot = transcript;
        self.persist_transcripts()?;
        Ok(())
    }

    fn persist_students(&self) -> anyhow::Result<()> {
        if let Some(store) = &self.store {
            store.set_collection(KEY_STUDENTS, &self.students)?;
        }
        Ok(())
    }

    fn persist_transcripts(&self) -> anyhow::Result<()> {
        if let Some(store) = &self.store {
            store.set_collection(KEY_TRANSCRIPTS, &self.transcripts)?;
        }
        Ok(())
    }
}
