// Standard GTM install snippets for a container public id.

#[derive(Debug, Clone, PartialEq)]
pub struct ContainerSnippet {
    /// Goes as high as possible in `<head>`.
    pub head: String,
    /// Goes immediately after the opening `<body>` tag.
    pub body: String,
}

pub fn container_snippet(public_id: &str) -> ContainerSnippet {
    let head = format!(
        "<!-- Google Tag Manager -->\n\
<script>(function(w,d,s,l,i){{w[l]=w[l]||[];w[l].push({{'gtm.start':\n\
new Date().getTime(),event:'gtm.js'}});var f=d.getElementsByTagName(s)[0],\n\
j=d.createElement(s),dl=l!='dataLayer'?'&l='+l:'';j.async=true;j.src=\n\
'https://www.googletagmanager.com/gtm.js?id='+i+dl;f.parentNode.insertBefore(j,f);\n\
}})(window,document,'script','dataLayer','{id}');</script>\n\
<!-- End Google Tag Manager -->",
        id = public_id
    );
    let body = format!(
        "<!-- Google Tag Manager (noscript) -->\n\
<noscript><iframe src=\"https://www.googletagmanager.com/ns.html?id={id}\"\n\
height=\"0\" width=\"0\" style=\"display:none;visibility:hidden\"></iframe></noscript>\n\
<!-- End Google Tag Manager (noscript) -->",
        id = public_id
    );
    ContainerSnippet { head, body }
}

impl ContainerSnippet {
    /// Install instructions as shown to the model.
    pub fn instructions(&self) -> String {
        format!(
            "Add this to your website's <head> section:\n```html\n{}\n```\n\nAdd this immediately after opening <body> tag:\n```html\n{}\n```",
            self.head, self.body
        )
    }

    /// Content of the file committed by `deploySnippet`.
    pub fn as_file(&self, public_id: &str) -> String {
        format!(
            "<!-- GTM container {} -->\n<!-- Paste the first block into <head>, the second right after <body>. -->\n\n{}\n\n{}\n",
            public_id, self.head, self.body
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snippet_embeds_public_id_in_both_blocks() {
        let snippet = container_snippet("GTM-ABC123");
        assert!(snippet.head.contains("'dataLayer','GTM-ABC123'"));
        assert!(snippet.head.contains("gtm.js?id="));
        assert!(snippet.body.contains("ns.html?id=GTM-ABC123"));
        assert!(snippet.instructions().contains("<head>"));
    }
}
