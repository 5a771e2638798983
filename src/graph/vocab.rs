//! Vocabulary terms used by the server.

use oxrdf::NamedNodeRef;

pub mod rdf {
    use super::NamedNodeRef;

    pub const TYPE: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/1999/02/22-rdf-syntax-ns#type");
}

pub mod ldp {
    use super::NamedNodeRef;

    pub const RESOURCE: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/ldp#Resource");
    pub const CONTAINER: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/ldp#Container");
    pub const BASIC_CONTAINER: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/ldp#BasicContainer");
    pub const CONTAINS: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/ldp#contains");
    pub const PREFER_CONTAINMENT: &str = "http://www.w3.org/ns/ldp#PreferContainment";
}

pub mod acl {
    use super::NamedNodeRef;

    pub const AUTHORIZATION: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/auth/acl#Authorization");
    pub const AGENT: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/auth/acl#agent");
    pub const AGENT_CLASS: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/auth/acl#agentClass");
    pub const AUTHENTICATED_AGENT: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/auth/acl#AuthenticatedAgent");
    pub const OWNER: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/auth/acl#owner");
    pub const ACCESS_TO: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/auth/acl#accessTo");
    pub const MODE: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/auth/acl#mode");
    pub const READ: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/auth/acl#Read");
    pub const WRITE: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/auth/acl#Write");
    pub const APPEND: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/auth/acl#Append");
    pub const CONTROL: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/auth/acl#Control");
}

pub mod foaf {
    use super::NamedNodeRef;

    pub const AGENT: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://xmlns.com/foaf/0.1/Agent");
}

pub mod cert {
    use super::NamedNodeRef;

    pub const KEY: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/auth/cert#key");
    pub const RSA_PUBLIC_KEY: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/auth/cert#RSAPublicKey");
    pub const MODULUS: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/auth/cert#modulus");
    pub const EXPONENT: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/auth/cert#exponent");
}

pub mod stat {
    use super::NamedNodeRef;

    pub const SIZE: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/posix/stat#size");
    pub const MTIME: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/posix/stat#mtime");
}
