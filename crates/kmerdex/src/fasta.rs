/// Parsed FASTA database: `(description, sequence)` pairs in file order
#[derive(Default, Debug, Clone, PartialEq)]
pub struct Fasta {
    pub entries: Vec<(String, String)>,
}

impl Fasta {
    // Parse a string into a fasta database
    pub fn parse<S: AsRef<str>>(contents: S) -> Fasta {
        let mut entries = Vec::new();
        let mut last_description: Option<&str> = None;
        let mut s = String::new();

        for line in contents.as_ref().lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if let Some(description) = line.strip_prefix('>') {
                if let Some(last) = last_description {
                    entries.push((last.to_string(), std::mem::take(&mut s)));
                }
                last_description = Some(description);
            } else {
                s.push_str(line);
            }
        }

        if let Some(last) = last_description {
            entries.push((last.to_string(), s));
        }

        Fasta { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::Fasta;

    #[test]
    fn parse_multiline() {
        let fasta = r#"
        >sp|P01308|INS_HUMAN Insulin OS=Homo sapiens
        MALWMRLLPL
        LALLALWGPD

        >tr|A0A000|TEST_MOUSE
        AC
        "#;

        let fasta = Fasta::parse(fasta);
        assert_eq!(
            fasta.entries,
            vec![
                (
                    "sp|P01308|INS_HUMAN Insulin OS=Homo sapiens".to_string(),
                    "MALWMRLLPLLALLALWGPD".to_string()
                ),
                ("tr|A0A000|TEST_MOUSE".to_string(), "AC".to_string()),
            ]
        );
    }

    #[test]
    fn empty_sequence_is_kept() {
        let fasta = Fasta::parse(">sp|EMPTY\n>sp|FULL\nGG\n");
        assert_eq!(fasta.len(), 2);
        assert_eq!(fasta.entries[0].1, "");
        assert_eq!(fasta.entries[1].1, "GG");
    }

    #[test]
    fn no_entries() {
        assert!(Fasta::parse("").is_empty());
        assert!(Fasta::parse("\n\n").is_empty());
    }
}
